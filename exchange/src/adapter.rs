//! Exchange capability seam.
//!
//! The executor talks to venues exclusively through `ExchangeAdapter`:
//! balance lookup, bulk market-order submission, and the taker fee rate.
//! One concrete venue implementation exists (`binance`) plus a paper-mode
//! variant that acknowledges without side effects.

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    #[default]
    Market,
}

/// One executable order derived from a cycle leg. Amount is the base
/// quantity and must be strictly positive by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderInstruction {
    pub symbol: String,
    pub side: Side,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub amount: Decimal,
}

impl OrderInstruction {
    pub fn market(symbol: impl Into<String>, side: Side, amount: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type: OrderType::Market,
            amount,
        }
    }
}

/// Venue acknowledgement for one submitted order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAck {
    pub order_id: String,
    pub symbol: String,
    pub status: String,
}

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("venue rejected request ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("missing API credentials for live trading")]
    MissingCredentials,

    #[error("request signing failed")]
    Signature,
}

#[async_trait]
pub trait ExchangeAdapter: Send + Sync {
    /// Free balance per asset.
    async fn fetch_balances(&self) -> Result<HashMap<String, Decimal>, ExchangeError>;

    /// Submit all orders. Implementations may submit concurrently; the
    /// first failure fails the whole batch.
    async fn create_bulk_orders(
        &self,
        orders: Vec<OrderInstruction>,
    ) -> Result<Vec<OrderAck>, ExchangeError>;

    /// Taker fee ratio applied to fills on `symbol`.
    fn fee_rate(&self, symbol: &str) -> Decimal;
}
