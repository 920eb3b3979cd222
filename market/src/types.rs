use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One resting level of an order-book side. Price and quantity are
/// strictly positive whenever the level is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    pub price: Decimal,
    pub qty: Decimal,
}

impl Level {
    pub fn new(price: Decimal, qty: Decimal) -> Self {
        Self { price, qty }
    }
}

/// Side of the book targeted by a depth query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookSide {
    Bid,
    Ask,
}

/// Canonical trading pair, rendered as "BASE/QUOTE".
#[derive(Debug, Clone, Eq, PartialEq, std::hash::Hash)]
pub struct Pair {
    pub base: String,
    pub quote: String,
}

impl Pair {
    pub fn new(base: String, quote: String) -> Self {
        Self { base, quote }
    }

    pub fn id(&self) -> String {
        format!("{}/{}", self.base, self.quote)
    }

    /// Split a canonical "BASE/QUOTE" symbol. Returns `None` for anything
    /// that is not exactly two non-empty assets joined by a single slash.
    pub fn parse(symbol: &str) -> Option<Self> {
        let (base, quote) = symbol.split_once('/')?;
        if base.is_empty() || quote.is_empty() || quote.contains('/') {
            return None;
        }
        Some(Self::new(base.to_string(), quote.to_string()))
    }
}

/// Top-of-book snapshot for one symbol.
///
/// Bids are held descending by price, asks ascending, so index 0 is always
/// the best level of each side. Up to the store's configured depth is
/// retained for cumulative-depth queries.
#[derive(Debug, Clone, Default)]
pub struct OrderBook {
    pub symbol: String,
    pub bids: Vec<Level>,
    pub asks: Vec<Level>,
}

impl OrderBook {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            bids: Vec::new(),
            asks: Vec::new(),
        }
    }

    /// Replace both sides, re-sorting and truncating to `depth` levels.
    pub fn replace(&mut self, mut bids: Vec<Level>, mut asks: Vec<Level>, depth: usize) {
        bids.sort_by(|a, b| b.price.cmp(&a.price));
        asks.sort_by(|a, b| a.price.cmp(&b.price));
        bids.truncate(depth);
        asks.truncate(depth);
        self.bids = bids;
        self.asks = asks;
    }

    pub fn best_bid_ask(&self) -> (Option<&Level>, Option<&Level>) {
        (self.bids.first(), self.asks.first())
    }

    /// Total quantity resting on the first `levels` levels of one side.
    pub fn cumulative_depth(&self, side: BookSide, levels: usize) -> Decimal {
        let book = match side {
            BookSide::Bid => &self.bids,
            BookSide::Ask => &self.asks,
        };
        book.iter().take(levels).map(|level| level.qty).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn pair_parse_accepts_canonical_symbols() {
        let pair = Pair::parse("ETH/USDT").unwrap();
        assert_eq!(pair.base, "ETH");
        assert_eq!(pair.quote, "USDT");
        assert_eq!(pair.id(), "ETH/USDT");
    }

    #[test]
    fn pair_parse_rejects_malformed_symbols() {
        assert!(Pair::parse("ETHUSDT").is_none());
        assert!(Pair::parse("/USDT").is_none());
        assert!(Pair::parse("ETH/").is_none());
        assert!(Pair::parse("A/B/C").is_none());
    }

    #[test]
    fn replace_sorts_both_sides() {
        let mut book = OrderBook::new("BTC/USDT");
        book.replace(
            vec![
                Level::new(dec!(99), dec!(1)),
                Level::new(dec!(101), dec!(2)),
                Level::new(dec!(100), dec!(3)),
            ],
            vec![
                Level::new(dec!(103), dec!(1)),
                Level::new(dec!(102), dec!(2)),
            ],
            5,
        );

        let (bid, ask) = book.best_bid_ask();
        assert_eq!(bid.unwrap().price, dec!(101));
        assert_eq!(ask.unwrap().price, dec!(102));
    }

    #[test]
    fn replace_truncates_to_depth() {
        let mut book = OrderBook::new("BTC/USDT");
        let levels: Vec<Level> = (1..=8)
            .map(|i| Level::new(Decimal::from(i), dec!(1)))
            .collect();
        book.replace(levels.clone(), levels, 3);

        assert_eq!(book.bids.len(), 3);
        assert_eq!(book.asks.len(), 3);
        // Truncation keeps the best levels, not the first-seen ones.
        assert_eq!(book.bids[0].price, dec!(8));
        assert_eq!(book.asks[0].price, dec!(1));
    }

    #[test]
    fn cumulative_depth_sums_requested_levels() {
        let mut book = OrderBook::new("BTC/USDT");
        book.replace(
            vec![
                Level::new(dec!(100), dec!(1)),
                Level::new(dec!(99), dec!(2)),
                Level::new(dec!(98), dec!(4)),
            ],
            vec![],
            5,
        );

        assert_eq!(book.cumulative_depth(BookSide::Bid, 2), dec!(3));
        assert_eq!(book.cumulative_depth(BookSide::Bid, 10), dec!(7));
        assert_eq!(book.cumulative_depth(BookSide::Ask, 2), Decimal::ZERO);
    }
}
