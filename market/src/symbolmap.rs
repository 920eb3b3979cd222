//! Venue symbol canonicalization.
//!
//! Binance streams report symbols without a separator (`ETHUSDT`). The
//! mapper recovers the canonical "BASE/QUOTE" spelling by suffix-matching
//! a configured list of quote assets, longest suffix first, so `ETHUSDT`
//! resolves against `USDT` before a shorter overlapping quote could claim
//! the tail.

pub struct SymbolMapper {
    /// Quote assets, uppercased, longest first.
    quotes: Vec<String>,
}

impl SymbolMapper {
    pub fn new(quotes: impl IntoIterator<Item = String>) -> Self {
        let mut quotes: Vec<String> = quotes
            .into_iter()
            .map(|q| q.trim().to_uppercase())
            .filter(|q| !q.is_empty())
            .collect();
        quotes.sort();
        quotes.dedup();
        quotes.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        Self { quotes }
    }

    /// Map a venue symbol to "BASE/QUOTE". `None` when no configured quote
    /// asset matches or the remaining base would be empty.
    pub fn canonical(&self, raw: &str) -> Option<String> {
        let raw = raw.trim().to_uppercase();
        for quote in &self.quotes {
            if let Some(base) = raw.strip_suffix(quote.as_str()) {
                if !base.is_empty() {
                    return Some(format!("{base}/{quote}"));
                }
            }
        }
        None
    }
}

/// Stream-name spelling of a canonical symbol: lowercased, slash stripped.
pub fn stream_symbol(symbol: &str) -> String {
    symbol.replace('/', "").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper() -> SymbolMapper {
        SymbolMapper::new(
            ["USDT", "BTC", "ETH", "BNB"]
                .into_iter()
                .map(String::from),
        )
    }

    #[test]
    fn canonicalizes_by_quote_suffix() {
        let m = mapper();
        assert_eq!(m.canonical("ETHUSDT").as_deref(), Some("ETH/USDT"));
        assert_eq!(m.canonical("ETHBTC").as_deref(), Some("ETH/BTC"));
        assert_eq!(m.canonical("bnbeth").as_deref(), Some("BNB/ETH"));
    }

    #[test]
    fn longest_suffix_wins() {
        let m = SymbolMapper::new(["T", "USDT"].into_iter().map(String::from));
        assert_eq!(m.canonical("BTCUSDT").as_deref(), Some("BTC/USDT"));
    }

    #[test]
    fn unmatched_or_degenerate_symbols_are_rejected() {
        let m = mapper();
        assert!(m.canonical("FOOBAR").is_none());
        // The whole symbol being a quote asset leaves no base.
        assert!(m.canonical("USDT").is_none());
    }

    #[test]
    fn stream_symbol_strips_and_lowercases() {
        assert_eq!(stream_symbol("BTC/USDT"), "btcusdt");
        assert_eq!(stream_symbol("ETH/BTC"), "ethbtc");
    }
}
