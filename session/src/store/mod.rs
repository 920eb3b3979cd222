mod sqlite_store;

pub use sqlite_store::SqliteTradeStore;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::model::{OpportunityRecord, TradeRecord};

/// Durable storage for emitted opportunities and executed trades.
///
/// The trading core only ever appends through this interface; reads exist
/// for operational inspection.
#[async_trait]
pub trait TradeStore: Send + Sync {
    async fn record_opportunity(
        &self,
        triangle_hash: &str,
        gross_bps: f64,
        net_bps: f64,
        notional_quote: f64,
    ) -> anyhow::Result<Uuid>;

    async fn record_trade(
        &self,
        opportunity_id: Uuid,
        details: Value,
        pnl_quote: f64,
    ) -> anyhow::Result<Uuid>;

    async fn recent_opportunities(&self, limit: i64) -> anyhow::Result<Vec<OpportunityRecord>>;

    async fn recent_trades(&self, limit: i64) -> anyhow::Result<Vec<TradeRecord>>;
}
