//! In-memory store of the latest order-book snapshot per symbol.
//!
//! Written only by the websocket ingest task, read concurrently by the
//! signal engine and the executor. Each `upsert` replaces a whole book
//! under the write lock, so readers observe every update as a single
//! transition. Entries are created on first update and overwritten
//! thereafter; nothing is ever deleted.

use std::collections::HashMap;

use parking_lot::RwLock;
use rust_decimal::Decimal;

use crate::types::{BookSide, Level, OrderBook};

pub struct OrderBookStore {
    depth: usize,
    books: RwLock<HashMap<String, OrderBook>>,
}

impl OrderBookStore {
    /// Create a store retaining up to `depth` levels per book side.
    pub fn new(depth: usize) -> Self {
        Self {
            depth: depth.max(1),
            books: RwLock::new(HashMap::new()),
        }
    }

    /// Replace both sides of `symbol` atomically with the provided levels.
    pub fn upsert(&self, symbol: &str, bids: Vec<Level>, asks: Vec<Level>) {
        let mut books = self.books.write();
        books
            .entry(symbol.to_string())
            .or_insert_with(|| OrderBook::new(symbol))
            .replace(bids, asks, self.depth);
    }

    /// Best bid and ask for `symbol`. Either side may be absent; a symbol
    /// that was never updated yields `(None, None)` rather than an error.
    pub fn best_bid_ask(&self, symbol: &str) -> (Option<Level>, Option<Level>) {
        let books = self.books.read();
        match books.get(symbol) {
            Some(book) => {
                let (bid, ask) = book.best_bid_ask();
                (bid.cloned(), ask.cloned())
            }
            None => (None, None),
        }
    }

    /// Quantity resting on the first `levels` levels of one side; zero for
    /// unknown symbols.
    pub fn cumulative_depth(&self, symbol: &str, side: BookSide, levels: usize) -> Decimal {
        let books = self.books.read();
        books
            .get(symbol)
            .map(|book| book.cumulative_depth(side, levels))
            .unwrap_or(Decimal::ZERO)
    }

    /// Number of symbols that have received at least one update.
    pub fn symbol_count(&self) -> usize {
        self.books.read().len()
    }
}
