use std::str::FromStr;

use rust_decimal::Decimal;

use crate::error::AppError;

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Venue identifier used for fee lookups and adapter selection.
    pub exchange: String,

    /// Asset every cycle starts and ends in.
    pub quote: String,

    /// Comma-separated base assets used to enumerate triangles. An empty
    /// list switches enumeration to discovery over the venue's market map.
    pub tri_symbols: String,

    /// Book depth retained per side (>= 1).
    pub top_levels: usize,

    /// Acknowledge orders synthetically instead of trading.
    pub paper_mode: bool,

    // =========================
    // Signal configuration
    // =========================
    /// Quote notional pushed through each simulated cycle.
    pub target_notional_quote: Decimal,

    /// Minimum gross edge (bps) required before a cycle is considered.
    pub min_gross_edge_bps: Decimal,

    /// Minimum net edge (bps) after the slippage reserve.
    pub min_net_edge_bps: Decimal,

    /// Per-leg slippage assumption (bps), also used as the executor's
    /// one-sided price buffer.
    pub slippage_bps: Decimal,

    /// JSON table `venue -> {taker, maker}` of fee ratios.
    pub fee_table_json: String,

    // =========================
    // Risk configuration
    // =========================
    /// Cap on the notional attached to any single cycle.
    pub max_leg_notional_quote: Decimal,

    /// Concurrent-cycle cap enforced by the risk gate (>= 1).
    pub max_open_cycles: u32,

    /// Reserved price buffer for tick rounding.
    pub price_tick_buffer_bps: Decimal,

    // =========================
    // Venue access
    // =========================
    pub binance_api_key: Option<String>,
    pub binance_api_secret: Option<String>,

    /// Primary websocket endpoint.
    pub binance_ws_base_url: String,

    /// Comma-separated backup websocket endpoints, tried round-robin on
    /// geo-block.
    pub binance_ws_alt_urls: String,

    /// Database connection string for the trade store.
    pub database_url: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self {
            exchange: env_or("EXCHANGE", "binance"),
            quote: env_or("QUOTE", "USDT").to_uppercase(),
            tri_symbols: env_or("TRI_SYMBOLS", "BTC,ETH,BNB"),
            top_levels: parse_env("TOP_LEVELS", "3")?,
            paper_mode: parse_bool("PAPER_MODE", true)?,

            target_notional_quote: parse_env("TARGET_NOTIONAL_QUOTE", "10000")?,
            min_gross_edge_bps: parse_env("MIN_GROSS_EDGE_BPS", "40")?,
            min_net_edge_bps: parse_env("MIN_NET_EDGE_BPS", "10")?,
            slippage_bps: parse_env("SLIPPAGE_BPS", "5")?,
            fee_table_json: env_or(
                "FEE_TABLE_JSON",
                r#"{"binance":{"taker":0.0004,"maker":0.0002}}"#,
            ),

            max_leg_notional_quote: parse_env("MAX_LEG_NOTIONAL_QUOTE", "20000")?,
            max_open_cycles: parse_env("MAX_OPEN_CYCLES", "1")?,
            price_tick_buffer_bps: parse_env("PRICE_TICK_BUFFER_BPS", "3")?,

            binance_api_key: std::env::var("BINANCE_API_KEY").ok(),
            binance_api_secret: std::env::var("BINANCE_API_SECRET").ok(),
            binance_ws_base_url: env_or("BINANCE_WS_BASE_URL", "wss://stream.binance.com:9443"),
            binance_ws_alt_urls: env_or("BINANCE_WS_ALT_URLS", "wss://stream.binance.us:9443"),

            database_url: env_or("DATABASE_URL", "sqlite://arb_dev.db?mode=rwc"),
        })
    }

    /// Configured base assets, trimmed and uppercased.
    pub fn base_symbols(&self) -> Vec<String> {
        self.tri_symbols
            .split(',')
            .map(|sym| sym.trim().to_uppercase())
            .filter(|sym| !sym.is_empty())
            .collect()
    }

    /// Websocket endpoints in failover order: base URL first, then the
    /// alternates, trimmed and deduplicated. Never empty.
    pub fn ws_urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = Vec::new();

        let candidates =
            std::iter::once(self.binance_ws_base_url.as_str()).chain(self.binance_ws_alt_urls.split(','));
        for candidate in candidates {
            let normalized = candidate.trim().trim_end_matches('/');
            if !normalized.is_empty() && !urls.iter().any(|known| known == normalized) {
                urls.push(normalized.to_string());
            }
        }

        if urls.is_empty() {
            urls.push("wss://stream.binance.com:9443".to_string());
        }
        urls
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T: FromStr>(key: &'static str, default: &str) -> Result<T, AppError> {
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse::<T>()
        .map_err(|_| AppError::InvalidConfig { key, value: raw })
}

fn parse_bool(key: &'static str, default: bool) -> Result<bool, AppError> {
    let Ok(raw) = std::env::var(key) else {
        return Ok(default);
    };
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(AppError::InvalidConfig { key, value: raw }),
    }
}
