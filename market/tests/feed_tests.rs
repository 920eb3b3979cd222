use std::sync::Arc;
use std::time::Duration;

use market::feed::MarketFeed;
use market::store::OrderBookStore;
use market::symbolmap::SymbolMapper;
use market::ws::{BinanceWsClient, StreamKind};

/// The stop signal must terminate the ingest task promptly even while the
/// client is stuck in its connect/backoff cycle against a dead endpoint.
#[tokio::test]
async fn stop_terminates_a_client_stuck_reconnecting() {
    let store = Arc::new(OrderBookStore::new(5));
    let mapper = SymbolMapper::new(["USDT".to_string()]);
    let client = BinanceWsClient::new(
        vec!["ws://127.0.0.1:9".into()],
        StreamKind::Depth,
        &["BTC/USDT".to_string()],
        mapper,
        store.clone(),
    );

    let feed = MarketFeed::start(client);
    tokio::time::sleep(Duration::from_millis(100)).await;

    tokio::time::timeout(Duration::from_secs(5), feed.stop())
        .await
        .expect("feed must stop promptly once signalled");

    assert_eq!(store.symbol_count(), 0);
}
