use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

/// Persisted record of an emitted opportunity, keyed by the triangle's
/// route signature for later aggregation.
#[derive(Debug, Clone)]
pub struct OpportunityRecord {
    pub id: Uuid,
    pub triangle_hash: String,
    pub gross_bps: f64,
    pub net_bps: f64,
    pub notional_quote: f64,
    pub created_at: DateTime<Utc>,
}

/// Persisted record of one executed cycle. `details` holds the submitted
/// instructions and the venue acknowledgements as a structured blob.
#[derive(Debug, Clone)]
pub struct TradeRecord {
    pub id: Uuid,
    pub opportunity_id: Uuid,
    pub details: Value,
    pub pnl_quote: f64,
    pub created_at: DateTime<Utc>,
}
