//! Instruction builder.
//!
//! Replays a winning cycle against the live order-book store (prices may
//! have moved since the signal snapshot) and derives the three executable
//! market orders. A one-sided slippage buffer is applied per leg: buys
//! price at `ask * (1 + slip)`, sells at `bid * (1 - slip)`. Amounts
//! propagate with `(1 - fee)` between legs; slippage is folded into the
//! price here, not deducted a second time.
//!
//! Every failure is a typed `BuildError` so the executor can release its
//! risk reservation without feeding the circuit breaker.

use rust_decimal::Decimal;
use thiserror::Error;

use common::math::apply_bps;
use engine::signal::Opportunity;
use exchange::adapter::{ExchangeAdapter, OrderInstruction, Side};
use market::store::OrderBookStore;
use market::types::Pair;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("missing book for {symbol}")]
    MissingBook { symbol: String },

    #[error("malformed symbol {symbol}")]
    BadSymbol { symbol: String },

    #[error("asset flow mismatch at {symbol} while holding {holding}")]
    AssetMismatch { symbol: String, holding: String },

    #[error("non-positive price for {symbol}")]
    InvalidPrice { symbol: String },

    #[error("non-positive amount for {symbol}")]
    InvalidAmount { symbol: String },

    #[error("cycle does not return to the quote asset")]
    OpenLoop,
}

pub fn build_instructions(
    opportunity: &Opportunity,
    store: &OrderBookStore,
    adapter: &dyn ExchangeAdapter,
    quote: &str,
    slippage_bps: Decimal,
) -> Result<Vec<OrderInstruction>, BuildError> {
    let mut holdings = opportunity.notional_quote;
    let mut asset = quote.to_string();
    let mut instructions = Vec::with_capacity(3);

    for leg in &opportunity.triangle.legs {
        let symbol = leg.symbol.as_str();

        let (bid, ask) = store.best_bid_ask(symbol);
        let (bid, ask) = match (bid, ask) {
            (Some(bid), Some(ask)) => (bid, ask),
            _ => {
                return Err(BuildError::MissingBook {
                    symbol: symbol.to_string(),
                });
            }
        };

        let pair = Pair::parse(symbol).ok_or_else(|| BuildError::BadSymbol {
            symbol: symbol.to_string(),
        })?;
        let fee = adapter.fee_rate(symbol);

        if asset == pair.quote && leg.from_asset == pair.quote {
            let price = apply_bps(ask.price, slippage_bps);
            if price <= Decimal::ZERO {
                return Err(BuildError::InvalidPrice {
                    symbol: symbol.to_string(),
                });
            }

            let qty = holdings / price;
            if qty <= Decimal::ZERO {
                return Err(BuildError::InvalidAmount {
                    symbol: symbol.to_string(),
                });
            }

            instructions.push(OrderInstruction::market(symbol, Side::Buy, qty));
            holdings = qty * (Decimal::ONE - fee);
            asset = pair.base;
        } else if asset == pair.base && leg.from_asset == pair.base {
            let price = apply_bps(bid.price, -slippage_bps);
            if price <= Decimal::ZERO {
                return Err(BuildError::InvalidPrice {
                    symbol: symbol.to_string(),
                });
            }

            let qty = holdings;
            if qty <= Decimal::ZERO {
                return Err(BuildError::InvalidAmount {
                    symbol: symbol.to_string(),
                });
            }

            instructions.push(OrderInstruction::market(symbol, Side::Sell, qty));
            holdings = qty * price * (Decimal::ONE - fee);
            asset = pair.quote;
        } else {
            return Err(BuildError::AssetMismatch {
                symbol: symbol.to_string(),
                holding: asset,
            });
        }
    }

    if asset != quote {
        return Err(BuildError::OpenLoop);
    }

    Ok(instructions)
}
