//! Paper-mode adapter: acknowledges orders without touching any venue.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::info;

use crate::adapter::{ExchangeAdapter, ExchangeError, OrderAck, OrderInstruction};

/// Paper balance granted in the quote asset.
const PAPER_BALANCE: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

pub struct PaperAdapter {
    balances: HashMap<String, Decimal>,
    taker_fee: Decimal,
    sequence: AtomicU64,
}

impl PaperAdapter {
    pub fn new(quote: &str, taker_fee: Decimal) -> Self {
        let mut balances = HashMap::new();
        balances.insert(quote.to_string(), PAPER_BALANCE);
        Self {
            balances,
            taker_fee,
            sequence: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl ExchangeAdapter for PaperAdapter {
    async fn fetch_balances(&self) -> Result<HashMap<String, Decimal>, ExchangeError> {
        Ok(self.balances.clone())
    }

    async fn create_bulk_orders(
        &self,
        orders: Vec<OrderInstruction>,
    ) -> Result<Vec<OrderAck>, ExchangeError> {
        let acks = orders
            .into_iter()
            .map(|order| {
                let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
                info!(
                    symbol = %order.symbol,
                    side = order.side.as_str(),
                    amount = %order.amount,
                    "paper order acknowledged"
                );
                OrderAck {
                    order_id: format!("paper-{seq}"),
                    symbol: order.symbol,
                    status: "FILLED".to_string(),
                }
            })
            .collect();

        Ok(acks)
    }

    fn fee_rate(&self, _symbol: &str) -> Decimal {
        self.taker_fee
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::Side;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn acknowledges_every_order_without_side_effects() {
        let adapter = PaperAdapter::new("USDT", dec!(0.0004));

        let orders = vec![
            OrderInstruction::market("BTC/USDT", Side::Buy, dec!(0.05)),
            OrderInstruction::market("ETH/BTC", Side::Buy, dec!(0.8)),
            OrderInstruction::market("ETH/USDT", Side::Sell, dec!(0.8)),
        ];

        let acks = adapter.create_bulk_orders(orders).await.unwrap();
        assert_eq!(acks.len(), 3);
        assert_eq!(acks[0].order_id, "paper-0");
        assert_eq!(acks[2].order_id, "paper-2");
        assert!(acks.iter().all(|ack| ack.status == "FILLED"));
    }

    #[tokio::test]
    async fn grants_a_quote_balance() {
        let adapter = PaperAdapter::new("USDT", dec!(0));
        let balances = adapter.fetch_balances().await.unwrap();
        assert_eq!(balances.get("USDT"), Some(&dec!(1_000_000)));
    }
}
