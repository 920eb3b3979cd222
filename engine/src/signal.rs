//! Signal engine.
//!
//! Each evaluation pass walks every triangle against the current
//! top-of-book snapshots, simulating the conversion of a target notional
//! of the quote asset through the three legs. Data problems (missing book
//! sides, malformed symbols, direction/holding mismatches) are non-error
//! outcomes: the triangle is silently non-viable for this pass.
//!
//! For identical store snapshots and configuration the output is
//! identical, in triangle-enumeration order.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::info;

use common::math::{bps_to_ratio, ratio_as_bps};
use market::store::OrderBookStore;
use market::types::Pair;

use crate::triangle::Triangle;

#[derive(Debug, Clone)]
pub struct SignalConfig {
    /// Asset every cycle starts and ends in.
    pub quote: String,
    /// Quote notional pushed through the simulated cycle.
    pub target_notional: Decimal,
    pub min_gross_edge_bps: Decimal,
    pub min_net_edge_bps: Decimal,
    pub slippage_bps: Decimal,
    /// Taker fee ratio for the configured venue.
    pub taker_fee: Decimal,
    /// Cap on the notional attached to an emitted opportunity.
    pub max_leg_notional: Decimal,
}

/// A cycle whose simulated edge cleared both thresholds. Created here,
/// moved into the executor, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct Opportunity {
    pub triangle: Triangle,
    pub gross_bps: Decimal,
    pub net_bps: Decimal,
    pub notional_quote: Decimal,
}

pub struct SignalEngine {
    triangles: Vec<Triangle>,
    store: Arc<OrderBookStore>,
    cfg: SignalConfig,
    /// Per-leg slippage ratio derived from `cfg.slippage_bps`.
    slip: Decimal,
}

impl SignalEngine {
    pub fn new(triangles: Vec<Triangle>, store: Arc<OrderBookStore>, cfg: SignalConfig) -> Self {
        let slip = bps_to_ratio(cfg.slippage_bps);
        Self {
            triangles,
            store,
            cfg,
            slip,
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn evaluate(&self) -> Vec<Opportunity> {
        let mut opportunities = Vec::new();
        let target = self.cfg.target_notional;

        for triangle in &self.triangles {
            let Some(amount) = self.walk_cycle(triangle) else {
                continue;
            };

            let gross_bps = ratio_as_bps(amount, target);
            // The per-leg walk above already deducts slippage; the 3x
            // reserve below double-counts it on purpose, keeping the
            // source design's conservative admission arithmetic.
            let net_bps = gross_bps - self.cfg.slippage_bps * Decimal::from(3);

            if gross_bps >= self.cfg.min_gross_edge_bps && net_bps >= self.cfg.min_net_edge_bps {
                info!(
                    route = %triangle.route(),
                    gross_bps = %gross_bps,
                    net_bps = %net_bps,
                    "opportunity detected"
                );
                opportunities.push(Opportunity {
                    triangle: triangle.clone(),
                    gross_bps,
                    net_bps,
                    notional_quote: self.cfg.max_leg_notional.min(target),
                });
            }
        }

        opportunities
    }

    /// Simulate the three conversions from `target_notional` of the quote
    /// asset. `None` marks the triangle non-viable for this pass.
    fn walk_cycle(&self, triangle: &Triangle) -> Option<Decimal> {
        let mut amount = self.cfg.target_notional;
        let mut holding = self.cfg.quote.clone();
        let keep = Decimal::ONE - (self.cfg.taker_fee + self.slip);

        for leg in &triangle.legs {
            let (bid, ask) = self.store.best_bid_ask(&leg.symbol);
            let (bid, ask) = (bid?, ask?);
            let pair = Pair::parse(&leg.symbol)?;

            if leg.from_asset == pair.quote && holding == pair.quote {
                // Buy the base at the ask.
                if ask.price <= Decimal::ZERO {
                    return None;
                }
                amount = amount / ask.price * keep;
                holding = pair.base;
            } else if leg.from_asset == pair.base && holding == pair.base {
                // Sell the base at the bid.
                if bid.price <= Decimal::ZERO {
                    return None;
                }
                amount = amount * bid.price * keep;
                holding = pair.quote;
            } else {
                return None;
            }
        }

        (holding == self.cfg.quote).then_some(amount)
    }
}
