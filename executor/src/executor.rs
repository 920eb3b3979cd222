//! Cycle executor.
//!
//! Converts an opportunity into a three-order instruction set and
//! dispatches it through the exchange adapter.
//!
//! Contract per invocation:
//! - exactly one risk reservation is taken, and exactly one matching
//!   release (success or build failure) or failure registration (submit
//!   failure) follows;
//! - a denied reservation returns immediately with no side effects;
//! - submission is never retried in flight — a failed cycle is a breaker
//!   event.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{error, info, warn};

use engine::risk::RiskManager;
use engine::signal::Opportunity;
use exchange::adapter::{ExchangeAdapter, OrderAck};
use market::store::OrderBookStore;

use crate::builder::{BuildError, build_instructions};

/// What became of one `execute` invocation. Failures are outcomes here,
/// not errors: each has already settled the risk counters.
#[derive(Debug)]
pub enum ExecutionOutcome {
    /// The risk gate refused the cycle; nothing was submitted.
    Rejected,
    /// The live books no longer supported the cycle; reservation released.
    BuildFailed(BuildError),
    /// At least one order submission failed; the breaker was fed.
    SubmitFailed,
    /// All three orders were acknowledged by the venue.
    Completed(Vec<OrderAck>),
}

pub struct Executor {
    adapter: Arc<dyn ExchangeAdapter>,
    store: Arc<OrderBookStore>,
    risk: Arc<RiskManager>,
    quote: String,
    /// One-sided per-leg price buffer, in basis points.
    slippage_bps: Decimal,
}

impl Executor {
    pub fn new(
        adapter: Arc<dyn ExchangeAdapter>,
        store: Arc<OrderBookStore>,
        risk: Arc<RiskManager>,
        quote: String,
        slippage_bps: Decimal,
    ) -> Self {
        Self {
            adapter,
            store,
            risk,
            quote,
            slippage_bps,
        }
    }

    pub async fn execute(&self, opportunity: Opportunity) -> ExecutionOutcome {
        let route = opportunity.triangle.route();

        if !self.risk.allow_cycle(opportunity.notional_quote) {
            info!(route = %route, "cycle rejected by risk gate");
            return ExecutionOutcome::Rejected;
        }

        let instructions = match build_instructions(
            &opportunity,
            &self.store,
            self.adapter.as_ref(),
            &self.quote,
            self.slippage_bps,
        ) {
            Ok(instructions) => instructions,
            Err(e) => {
                warn!(route = %route, error = %e, "instruction build failed; releasing reservation");
                self.risk.release_cycle();
                return ExecutionOutcome::BuildFailed(e);
            }
        };

        for order in &instructions {
            info!(
                symbol = %order.symbol,
                side = order.side.as_str(),
                amount = %order.amount,
                "submitting order"
            );
        }

        match self.adapter.create_bulk_orders(instructions).await {
            Ok(acks) => {
                info!(route = %route, net_bps = %opportunity.net_bps, "cycle executed");
                self.risk.release_cycle();
                ExecutionOutcome::Completed(acks)
            }
            Err(e) => {
                error!(route = %route, error = %e, "cycle submission failed");
                self.risk.register_failure();
                ExecutionOutcome::SubmitFailed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    use engine::triangle::{Triangle, TriangleLeg};
    use exchange::adapter::{ExchangeError, OrderInstruction, Side};
    use market::types::Level;

    struct MockAdapter {
        batches: AtomicUsize,
        captured: Mutex<Vec<OrderInstruction>>,
        fee: Decimal,
        fail: bool,
        delay: Duration,
    }

    impl MockAdapter {
        fn new() -> Self {
            Self {
                batches: AtomicUsize::new(0),
                captured: Mutex::new(Vec::new()),
                fee: Decimal::ZERO,
                fail: false,
                delay: Duration::ZERO,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new()
            }
        }

        fn batches(&self) -> usize {
            self.batches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ExchangeAdapter for MockAdapter {
        async fn fetch_balances(&self) -> Result<HashMap<String, Decimal>, ExchangeError> {
            Ok(HashMap::new())
        }

        async fn create_bulk_orders(
            &self,
            orders: Vec<OrderInstruction>,
        ) -> Result<Vec<OrderAck>, ExchangeError> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.batches.fetch_add(1, Ordering::SeqCst);

            if self.fail {
                return Err(ExchangeError::Api {
                    status: 500,
                    body: "boom".into(),
                });
            }

            let acks = orders
                .iter()
                .enumerate()
                .map(|(idx, order)| OrderAck {
                    order_id: format!("mock-{idx}"),
                    symbol: order.symbol.clone(),
                    status: "FILLED".into(),
                })
                .collect();
            self.captured.lock().unwrap().extend(orders);
            Ok(acks)
        }

        fn fee_rate(&self, _symbol: &str) -> Decimal {
            self.fee
        }
    }

    fn make_triangle() -> Triangle {
        Triangle::new([
            TriangleLeg::new("BTC/USDT", "USDT", "BTC"),
            TriangleLeg::new("ETH/BTC", "BTC", "ETH"),
            TriangleLeg::new("ETH/USDT", "ETH", "USDT"),
        ])
    }

    fn make_opportunity(notional: Decimal) -> Opportunity {
        Opportunity {
            triangle: make_triangle(),
            gross_bps: dec!(500),
            net_bps: dec!(485),
            notional_quote: notional,
        }
    }

    fn seeded_store() -> Arc<OrderBookStore> {
        let store = Arc::new(OrderBookStore::new(5));
        store.upsert(
            "BTC/USDT",
            vec![Level::new(dec!(19_990), dec!(1))],
            vec![Level::new(dec!(20_000), dec!(1))],
        );
        store.upsert(
            "ETH/BTC",
            vec![Level::new(dec!(0.0599), dec!(10))],
            vec![Level::new(dec!(0.06), dec!(10))],
        );
        store.upsert(
            "ETH/USDT",
            vec![Level::new(dec!(1260), dec!(10))],
            vec![Level::new(dec!(1261), dec!(10))],
        );
        store
    }

    fn make_executor(
        adapter: Arc<MockAdapter>,
        store: Arc<OrderBookStore>,
        risk: Arc<RiskManager>,
        slippage_bps: Decimal,
    ) -> Executor {
        Executor::new(adapter, store, risk, "USDT".into(), slippage_bps)
    }

    #[tokio::test]
    async fn completed_cycle_settles_the_reservation() {
        let adapter = Arc::new(MockAdapter::new());
        let risk = Arc::new(RiskManager::new(1, dec!(20_000)));
        let executor = make_executor(adapter.clone(), seeded_store(), risk.clone(), dec!(0));

        let outcome = executor.execute(make_opportunity(dec!(1000))).await;

        match outcome {
            ExecutionOutcome::Completed(acks) => assert_eq!(acks.len(), 3),
            other => panic!("expected Completed, got {other:?}"),
        }
        assert_eq!(risk.open_cycles(), 0, "reservation must be released");
        assert_eq!(adapter.batches(), 1);
    }

    #[tokio::test]
    async fn instructions_mirror_the_cycle_with_fee_propagation() {
        let adapter = Arc::new(MockAdapter {
            fee: dec!(0.001),
            ..MockAdapter::new()
        });
        let risk = Arc::new(RiskManager::new(1, dec!(20_000)));
        let executor = make_executor(adapter.clone(), seeded_store(), risk, dec!(0));

        executor.execute(make_opportunity(dec!(1000))).await;

        let orders = adapter.captured.lock().unwrap().clone();
        assert_eq!(orders.len(), 3);

        // 1000 USDT buys 0.05 BTC at the 20000 ask.
        assert_eq!(orders[0].side, Side::Buy);
        assert_eq!(orders[0].amount, dec!(0.05));
        // 0.05 BTC nets 0.04995 after the 10 bps fee, buying 0.8325 ETH.
        assert_eq!(orders[1].side, Side::Buy);
        assert_eq!(orders[1].amount, dec!(0.8325));
        // The full ETH holding is sold.
        assert_eq!(orders[2].side, Side::Sell);
        assert_eq!(orders[2].amount, dec!(0.8325));
    }

    #[tokio::test]
    async fn buys_pay_a_one_sided_slippage_buffer() {
        let adapter = Arc::new(MockAdapter::new());
        let risk = Arc::new(RiskManager::new(1, dec!(20_000)));
        let executor = make_executor(adapter.clone(), seeded_store(), risk, dec!(5));

        executor.execute(make_opportunity(dec!(1000))).await;

        let orders = adapter.captured.lock().unwrap().clone();
        // Buy quantity shrinks against the buffered ask of 20000 * 1.0005.
        assert!(orders[0].amount < dec!(0.05));
        assert!(orders[0].amount > dec!(0.0499));
        // The sell leg passes its full holding through; the buffer only
        // discounts the expected proceeds, not the submitted quantity.
        assert_eq!(orders[2].amount, orders[1].amount);
    }

    #[tokio::test]
    async fn denied_reservation_submits_nothing() {
        let adapter = Arc::new(MockAdapter::new());
        let risk = Arc::new(RiskManager::new(1, dec!(20_000)));
        assert!(risk.allow_cycle(dec!(1000)), "occupy the only slot");

        let executor = make_executor(adapter.clone(), seeded_store(), risk.clone(), dec!(0));
        let outcome = executor.execute(make_opportunity(dec!(1000))).await;

        assert!(matches!(outcome, ExecutionOutcome::Rejected));
        assert_eq!(adapter.batches(), 0);
        assert_eq!(risk.open_cycles(), 1, "foreign reservation must survive");
    }

    #[tokio::test]
    async fn second_cycle_is_rejected_while_first_is_in_flight() {
        let adapter = Arc::new(MockAdapter {
            delay: Duration::from_millis(50),
            ..MockAdapter::new()
        });
        let risk = Arc::new(RiskManager::new(1, dec!(20_000)));
        let executor = Arc::new(make_executor(
            adapter.clone(),
            seeded_store(),
            risk.clone(),
            dec!(0),
        ));

        let first = {
            let executor = executor.clone();
            tokio::spawn(async move { executor.execute(make_opportunity(dec!(1000))).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let second = executor.execute(make_opportunity(dec!(1000))).await;
        assert!(matches!(second, ExecutionOutcome::Rejected));

        assert!(matches!(
            first.await.unwrap(),
            ExecutionOutcome::Completed(_)
        ));
        assert_eq!(adapter.batches(), 1);
        assert_eq!(risk.open_cycles(), 0);
    }

    #[tokio::test]
    async fn missing_books_release_without_feeding_the_breaker() {
        let adapter = Arc::new(MockAdapter::new());
        let risk = Arc::new(RiskManager::new(1, dec!(20_000)));
        let store = Arc::new(OrderBookStore::new(5));
        let executor = make_executor(adapter.clone(), store, risk.clone(), dec!(0));

        let outcome = executor.execute(make_opportunity(dec!(1000))).await;

        match outcome {
            ExecutionOutcome::BuildFailed(BuildError::MissingBook { symbol }) => {
                assert_eq!(symbol, "BTC/USDT");
            }
            other => panic!("expected BuildFailed, got {other:?}"),
        }
        assert_eq!(adapter.batches(), 0);
        assert_eq!(risk.open_cycles(), 0);
        // Build failures are data problems, not breaker events.
        assert!(risk.allow_cycle(dec!(1000)));
    }

    #[tokio::test]
    async fn asset_flow_mismatch_aborts_the_build() {
        let adapter = Arc::new(MockAdapter::new());
        let risk = Arc::new(RiskManager::new(1, dec!(20_000)));
        let executor = make_executor(adapter.clone(), seeded_store(), risk.clone(), dec!(0));

        let mut opportunity = make_opportunity(dec!(1000));
        opportunity.triangle = Triangle::new([
            TriangleLeg::new("BTC/USDT", "USDT", "BTC"),
            TriangleLeg::new("ETH/USDT", "ETH", "USDT"),
            TriangleLeg::new("ETH/BTC", "BTC", "ETH"),
        ]);

        let outcome = executor.execute(opportunity).await;
        assert!(matches!(
            outcome,
            ExecutionOutcome::BuildFailed(BuildError::AssetMismatch { .. })
        ));
        assert_eq!(risk.open_cycles(), 0);
    }

    #[tokio::test]
    async fn repeated_submit_failures_trip_the_breaker() {
        let adapter = Arc::new(MockAdapter::failing());
        let risk = Arc::new(RiskManager::new(2, dec!(20_000)));
        let executor = make_executor(adapter.clone(), seeded_store(), risk.clone(), dec!(0));

        for _ in 0..5 {
            let outcome = executor.execute(make_opportunity(dec!(1000))).await;
            assert!(matches!(outcome, ExecutionOutcome::SubmitFailed));
        }
        assert_eq!(adapter.batches(), 5);

        // Sixth opportunity is refused at admission.
        let outcome = executor.execute(make_opportunity(dec!(1000))).await;
        assert!(matches!(outcome, ExecutionOutcome::Rejected));
        assert_eq!(adapter.batches(), 5);
    }
}
