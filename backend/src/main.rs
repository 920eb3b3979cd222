use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::json;
use uuid::Uuid;

use backend::{config::AppConfig, error::AppError, metrics::Counters};
use common::logger::init_logger;
use engine::{
    fees::FeeTable,
    risk::RiskManager,
    signal::{Opportunity, SignalConfig, SignalEngine},
    triangle::{Triangle, build_triangles, discover_triangles},
};
use exchange::{
    adapter::ExchangeAdapter,
    binance::{BinanceAdapter, BinanceCredentials},
    paper::PaperAdapter,
};
use executor::{ExecutionOutcome, Executor};
use market::{
    feed::MarketFeed,
    store::OrderBookStore,
    symbolmap::SymbolMapper,
    types::Pair,
    ws::{BinanceWsClient, StreamKind},
};
use session::store::{SqliteTradeStore, TradeStore};

/// Every distinct symbol the enumerated triangles trade, in stable order.
fn unique_symbols(triangles: &[Triangle]) -> Vec<String> {
    let mut symbols: Vec<String> = triangles
        .iter()
        .flat_map(|triangle| triangle.symbols().into_iter().map(String::from))
        .collect();
    symbols.sort();
    symbols.dedup();
    symbols
}

/// Quote-asset vocabulary for wire-symbol canonicalization: the cycle
/// quote, the configured bases, and every quote asset the enumerated
/// symbols actually use.
fn quote_assets(cfg: &AppConfig, triangles: &[Triangle]) -> Vec<String> {
    let mut quotes = vec![cfg.quote.clone()];
    quotes.extend(cfg.base_symbols());
    for triangle in triangles {
        for leg in &triangle.legs {
            if let Some(pair) = Pair::parse(&leg.symbol) {
                quotes.push(pair.quote);
            }
        }
    }
    quotes.sort();
    quotes.dedup();
    quotes
}

/// Spawn the websocket ingest task feeding the shared book store.
fn start_market_feed(
    cfg: &AppConfig,
    triangles: &[Triangle],
    store: Arc<OrderBookStore>,
) -> MarketFeed {
    let symbols = unique_symbols(triangles);
    let mapper = SymbolMapper::new(quote_assets(cfg, triangles));
    let client = BinanceWsClient::new(cfg.ws_urls(), StreamKind::Depth, &symbols, mapper, store);
    MarketFeed::start(client)
}

/// Enumerate the cycles to trade: from the configured bases, or from the
/// venue's market map when no bases are configured.
async fn enumerate_triangles(
    cfg: &AppConfig,
    binance: Option<&BinanceAdapter>,
) -> anyhow::Result<Vec<Triangle>> {
    let bases = cfg.base_symbols();
    if !bases.is_empty() {
        return Ok(build_triangles(&cfg.quote, &bases));
    }

    match binance {
        Some(adapter) => {
            let listings = adapter.markets().await?;
            Ok(discover_triangles(&cfg.quote, listings))
        }
        None => Ok(Vec::new()),
    }
}

async fn persist_opportunity(
    trades: &dyn TradeStore,
    opportunity: &Opportunity,
) -> Option<Uuid> {
    let result = trades
        .record_opportunity(
            &opportunity.triangle.signature(),
            opportunity.gross_bps.to_f64().unwrap_or_default(),
            opportunity.net_bps.to_f64().unwrap_or_default(),
            opportunity.notional_quote.to_f64().unwrap_or_default(),
        )
        .await;

    match result {
        Ok(id) => Some(id),
        Err(e) => {
            tracing::warn!(error = ?e, "failed to persist opportunity");
            None
        }
    }
}

/// Evaluate-and-execute loop: one pass every 250ms against the live
/// store, each opportunity awaited to completion before the next.
async fn run_control_loop(
    signal_engine: &SignalEngine,
    cycle_executor: &Executor,
    trades: &dyn TradeStore,
    counters: &Counters,
) {
    let mut ticker = tokio::time::interval(Duration::from_millis(250));

    loop {
        ticker.tick().await;
        counters.eval_ticks.fetch_add(1, Ordering::Relaxed);

        for opportunity in signal_engine.evaluate() {
            counters.opportunities.fetch_add(1, Ordering::Relaxed);

            let opportunity_id = persist_opportunity(trades, &opportunity).await;
            let route = opportunity.triangle.route();
            let expected_pnl =
                opportunity.notional_quote * opportunity.net_bps / Decimal::from(10_000);

            match cycle_executor.execute(opportunity).await {
                ExecutionOutcome::Completed(acks) => {
                    counters.cycles_completed.fetch_add(1, Ordering::Relaxed);
                    if let Some(id) = opportunity_id {
                        let details = json!({ "route": route, "acks": acks });
                        if let Err(e) = trades
                            .record_trade(id, details, expected_pnl.to_f64().unwrap_or_default())
                            .await
                        {
                            tracing::warn!(error = ?e, "failed to persist trade");
                        }
                    }
                }
                ExecutionOutcome::Rejected => {
                    counters.cycles_rejected.fetch_add(1, Ordering::Relaxed);
                }
                ExecutionOutcome::BuildFailed(_) => {
                    counters.build_failures.fetch_add(1, Ordering::Relaxed);
                }
                ExecutionOutcome::SubmitFailed => {
                    counters.submit_failures.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger("backend");

    let cfg = AppConfig::from_env()?;
    let fees = FeeTable::from_json(&cfg.fee_table_json)
        .map_err(|e| AppError::InvalidFeeTable(e.to_string()))?;

    // Live mode constructs the venue adapter up front so discovery and
    // trading share one metadata load.
    let binance = (!cfg.paper_mode).then(|| {
        Arc::new(BinanceAdapter::new(
            None,
            BinanceCredentials {
                api_key: cfg.binance_api_key.clone(),
                api_secret: cfg.binance_api_secret.clone(),
            },
            &fees,
        ))
    });

    let triangles = enumerate_triangles(&cfg, binance.as_deref()).await?;
    anyhow::ensure!(!triangles.is_empty(), "no tradable triangles enumerated");

    let symbols = unique_symbols(&triangles);
    tracing::info!(
        triangles = triangles.len(),
        symbols = symbols.len(),
        quote = %cfg.quote,
        paper_mode = cfg.paper_mode,
        "cycles enumerated"
    );

    let store = Arc::new(OrderBookStore::new(cfg.top_levels));
    let trades: Arc<dyn TradeStore> = Arc::new(SqliteTradeStore::new(&cfg.database_url).await?);

    let adapter: Arc<dyn ExchangeAdapter> = match binance {
        Some(adapter) => adapter,
        None => Arc::new(PaperAdapter::new(
            &cfg.quote,
            fees.taker_fee(&cfg.exchange),
        )),
    };

    match adapter.fetch_balances().await {
        Ok(balances) => tracing::info!(assets = balances.len(), "balances fetched"),
        Err(e) => tracing::warn!(error = %e, "balance fetch failed; continuing"),
    }

    let risk = Arc::new(RiskManager::new(
        cfg.max_open_cycles,
        cfg.max_leg_notional_quote,
    ));

    let signal_engine = SignalEngine::new(
        triangles.clone(),
        store.clone(),
        SignalConfig {
            quote: cfg.quote.clone(),
            target_notional: cfg.target_notional_quote,
            min_gross_edge_bps: cfg.min_gross_edge_bps,
            min_net_edge_bps: cfg.min_net_edge_bps,
            slippage_bps: cfg.slippage_bps,
            taker_fee: fees.taker_fee(&cfg.exchange),
            max_leg_notional: cfg.max_leg_notional_quote,
        },
    );

    let cycle_executor = Executor::new(
        adapter,
        store.clone(),
        risk,
        cfg.quote.clone(),
        cfg.slippage_bps,
    );

    let feed = start_market_feed(&cfg, &triangles, store);
    let counters = Counters::default();

    tracing::info!("engine started; waiting for shutdown signal");

    tokio::select! {
        _ = run_control_loop(&signal_engine, &cycle_executor, trades.as_ref(), &counters) => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("shutdown signal received");
        }
    }

    feed.stop().await;
    tracing::info!(
        opportunities = counters.opportunities.load(Ordering::Relaxed),
        completed = counters.cycles_completed.load(Ordering::Relaxed),
        "engine stopped"
    );
    Ok(())
}
