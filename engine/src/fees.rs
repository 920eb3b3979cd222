//! Per-venue trading-cost lookup, parsed once from configuration.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Deserialize;

/// Taker fee assumed for venues missing from the table: 10 bps.
const DEFAULT_TAKER_FEE: Decimal = Decimal::from_parts(1, 0, 0, false, 3);

#[derive(Debug, Clone, Deserialize)]
pub struct VenueFees {
    pub taker: Decimal,
    pub maker: Decimal,
}

#[derive(Debug, Clone, Default)]
pub struct FeeTable {
    venues: HashMap<String, VenueFees>,
}

impl FeeTable {
    /// Parse a `venue -> {taker, maker}` table from its JSON spelling.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        Ok(Self {
            venues: serde_json::from_str(raw)?,
        })
    }

    /// Taker fee ratio for `venue`; unknown venues fall back to 10 bps.
    pub fn taker_fee(&self, venue: &str) -> Decimal {
        self.venues
            .get(venue)
            .map(|fees| fees.taker)
            .unwrap_or(DEFAULT_TAKER_FEE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_the_configured_table() {
        let table = FeeTable::from_json(r#"{"binance":{"taker":0.0004,"maker":0.0002}}"#).unwrap();
        assert_eq!(table.taker_fee("binance"), dec!(0.0004));
    }

    #[test]
    fn unknown_venue_falls_back_to_ten_bps() {
        let table = FeeTable::default();
        assert_eq!(table.taker_fee("kraken"), dec!(0.001));
    }

    #[test]
    fn malformed_table_is_an_error() {
        assert!(FeeTable::from_json("{not json").is_err());
        assert!(FeeTable::from_json(r#"{"binance":{"taker":"x"}}"#).is_err());
    }
}
