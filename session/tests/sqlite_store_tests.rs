use serde_json::json;
use uuid::Uuid;

use session::store::{SqliteTradeStore, TradeStore};

async fn make_store() -> SqliteTradeStore {
    SqliteTradeStore::new("sqlite::memory:")
        .await
        .expect("in-memory store must initialize")
}

#[tokio::test]
async fn records_and_reads_back_trades() {
    let store = make_store().await;

    let opportunity_id = store
        .record_opportunity(
            "BTC/USDT:USDT->BTC|ETH/BTC:BTC->ETH|ETH/USDT:ETH->USDT",
            500.0,
            485.0,
            1000.0,
        )
        .await
        .unwrap();

    let details = json!({
        "instructions": [{"symbol": "BTC/USDT", "side": "buy", "amount": "0.05"}],
        "acks": [{"order_id": "paper-0", "status": "FILLED"}],
    });
    let trade_id = store
        .record_trade(opportunity_id, details.clone(), 48.5)
        .await
        .unwrap();

    let trades = store.recent_trades(10).await.unwrap();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].id, trade_id);
    assert_eq!(trades[0].opportunity_id, opportunity_id);
    assert_eq!(trades[0].details, details);
    assert_eq!(trades[0].pnl_quote, 48.5);
}

#[tokio::test]
async fn records_and_reads_back_opportunities() {
    let store = make_store().await;

    let first = store
        .record_opportunity("hash-a", 500.0, 485.0, 1000.0)
        .await
        .unwrap();
    store
        .record_opportunity("hash-b", 120.0, 105.0, 2000.0)
        .await
        .unwrap();

    let opportunities = store.recent_opportunities(10).await.unwrap();
    assert_eq!(opportunities.len(), 2);

    let read_back = opportunities
        .iter()
        .find(|opp| opp.id == first)
        .expect("first opportunity must be readable");
    assert_eq!(read_back.triangle_hash, "hash-a");
    assert_eq!(read_back.gross_bps, 500.0);
    assert_eq!(read_back.net_bps, 485.0);
    assert_eq!(read_back.notional_quote, 1000.0);

    assert_eq!(store.recent_opportunities(1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn recent_trades_respects_the_limit() {
    let store = make_store().await;
    let opportunity_id = store
        .record_opportunity("hash", 100.0, 85.0, 1000.0)
        .await
        .unwrap();

    for i in 0..5 {
        store
            .record_trade(opportunity_id, json!({"n": i}), 0.0)
            .await
            .unwrap();
    }

    let trades = store.recent_trades(3).await.unwrap();
    assert_eq!(trades.len(), 3);
}

#[tokio::test]
async fn trades_reference_their_opportunity() {
    let store = make_store().await;

    let first = store
        .record_opportunity("hash-a", 100.0, 85.0, 1000.0)
        .await
        .unwrap();
    let second = store
        .record_opportunity("hash-b", 120.0, 105.0, 1000.0)
        .await
        .unwrap();
    assert_ne!(first, second);

    store
        .record_trade(second, json!({}), 1.0)
        .await
        .unwrap();

    let trades = store.recent_trades(10).await.unwrap();
    assert_eq!(trades[0].opportunity_id, second);
}

#[tokio::test]
async fn unknown_database_path_is_an_error() {
    let result = SqliteTradeStore::new("sqlite:///nonexistent-dir/trades.db").await;
    assert!(result.is_err());
}

#[tokio::test]
async fn ids_are_unique_per_record() {
    let store = make_store().await;
    let mut seen = std::collections::HashSet::new();
    for _ in 0..10 {
        let id: Uuid = store
            .record_opportunity("hash", 1.0, 1.0, 1.0)
            .await
            .unwrap();
        assert!(seen.insert(id));
    }
}
