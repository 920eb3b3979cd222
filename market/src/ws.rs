//! Binance combined-stream websocket client.
//!
//! Responsibilities:
//! - Build the `/stream?streams=...` subscription URL for the configured
//!   symbols (depth or bookTicker stream kinds).
//! - Read envelope messages, parse price levels to decimals, canonicalize
//!   the venue symbol, and upsert the shared order-book store.
//! - Keep the connection alive with 20s heartbeat pings and reconnect with
//!   exponential backoff (1s doubling to 30s, reset on any applied message).
//! - Rotate to the next configured endpoint when the upgrade handshake is
//!   geo-blocked (HTTP 451); all other errors retry the current endpoint.
//! - Terminate promptly on the owner's stop signal, closing the socket.
//!
//! The client never blocks evaluation: upserts are fire-and-forget.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::{
    WebSocketStream, connect_async,
    tungstenite::{Bytes, Error as WsError, Message, http::StatusCode},
};
use tracing::{debug, info, warn};

use crate::store::OrderBookStore;
use crate::symbolmap::{SymbolMapper, stream_symbol};
use crate::types::Level;

const PING_INTERVAL: Duration = Duration::from_secs(20);
const PING_TIMEOUT: Duration = Duration::from_secs(20);
const BACKOFF_INITIAL: Duration = Duration::from_secs(1);
const BACKOFF_MAX: Duration = Duration::from_secs(30);

/// Which combined-stream flavor to subscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// `{symbol}@depth5@100ms`: top-5 levels per side.
    Depth,
    /// `{symbol}@bookTicker`: best bid/ask only.
    BookTicker,
}

impl StreamKind {
    fn stream_name(self, symbol: &str) -> String {
        match self {
            StreamKind::Depth => format!("{}@depth5@100ms", stream_symbol(symbol)),
            StreamKind::BookTicker => format!("{}@bookTicker", stream_symbol(symbol)),
        }
    }
}

/// Ordered endpoint list with round-robin advance on geo-block.
pub struct EndpointRotation {
    urls: Vec<String>,
    index: usize,
}

impl EndpointRotation {
    /// `urls` must contain at least one endpoint.
    pub fn new(urls: Vec<String>) -> Self {
        assert!(!urls.is_empty(), "endpoint list must not be empty");
        Self { urls, index: 0 }
    }

    pub fn current(&self) -> &str {
        &self.urls[self.index]
    }

    /// Move to the next endpoint. Returns false when there is no alternate.
    pub fn advance(&mut self) -> bool {
        if self.urls.len() <= 1 {
            return false;
        }
        self.index = (self.index + 1) % self.urls.len();
        true
    }
}

/// Reconnect delay: starts at 1s, doubles up to 30s, reset on progress.
pub struct Backoff {
    current: Duration,
}

impl Backoff {
    pub fn new() -> Self {
        Self {
            current: BACKOFF_INITIAL,
        }
    }

    /// The delay to sleep now; doubles the next one up to the cap.
    pub fn next(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(BACKOFF_MAX);
        delay
    }

    pub fn reset(&mut self) {
        self.current = BACKOFF_INITIAL;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

enum SessionEnd {
    Shutdown,
    Reconnect,
}

pub struct BinanceWsClient {
    endpoints: EndpointRotation,
    stream_query: String,
    mapper: SymbolMapper,
    store: Arc<OrderBookStore>,
}

impl BinanceWsClient {
    pub fn new(
        endpoints: Vec<String>,
        kind: StreamKind,
        symbols: &[String],
        mapper: SymbolMapper,
        store: Arc<OrderBookStore>,
    ) -> Self {
        let stream_query = symbols
            .iter()
            .map(|symbol| kind.stream_name(symbol))
            .collect::<Vec<_>>()
            .join("/");

        Self {
            endpoints: EndpointRotation::new(endpoints),
            stream_query,
            mapper,
            store,
        }
    }

    /// Connect-read-reconnect loop. Runs until `stop` flips to true or its
    /// sender is dropped; the socket is closed on every exit path.
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) {
        let mut backoff = Backoff::new();

        loop {
            if *stop.borrow() {
                return;
            }

            let url = format!(
                "{}/stream?streams={}",
                self.endpoints.current(),
                self.stream_query
            );

            match connect_async(&url).await {
                Ok((ws, _)) => {
                    info!(endpoint = %self.endpoints.current(), "market stream connected");
                    if let SessionEnd::Shutdown =
                        self.read_session(ws, &mut stop, &mut backoff).await
                    {
                        info!("market stream stopped");
                        return;
                    }
                }
                Err(e) if is_geo_blocked(&e) => {
                    warn!(
                        endpoint = %self.endpoints.current(),
                        "endpoint geo-blocked (451); rotating"
                    );
                    self.endpoints.advance();
                }
                Err(e) => {
                    warn!(endpoint = %self.endpoints.current(), error = %e, "connect failed");
                }
            }

            let delay = backoff.next();
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = stop.changed() => return,
            }
        }
    }

    async fn read_session<S>(
        &self,
        ws: WebSocketStream<S>,
        stop: &mut watch::Receiver<bool>,
        backoff: &mut Backoff,
    ) -> SessionEnd
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let (mut write, mut read) = ws.split();

        let mut ping = tokio::time::interval(PING_INTERVAL);
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // An interval's first tick completes immediately; consume it.
        ping.tick().await;

        let mut last_rx = Instant::now();

        loop {
            tokio::select! {
                _ = stop.changed() => {
                    let _ = write.send(Message::Close(None)).await;
                    return SessionEnd::Shutdown;
                }

                _ = ping.tick() => {
                    if last_rx.elapsed() > PING_INTERVAL + PING_TIMEOUT {
                        warn!("no traffic within ping window; reconnecting");
                        return SessionEnd::Reconnect;
                    }
                    if write.send(Message::Ping(Bytes::new())).await.is_err() {
                        return SessionEnd::Reconnect;
                    }
                }

                msg = read.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        last_rx = Instant::now();
                        if self.apply_message(text.as_str()) {
                            backoff.reset();
                        }
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        last_rx = Instant::now();
                        if write.send(Message::Pong(payload)).await.is_err() {
                            return SessionEnd::Reconnect;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {
                        last_rx = Instant::now();
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        warn!("market stream closed by peer");
                        return SessionEnd::Reconnect;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "market stream read error");
                        return SessionEnd::Reconnect;
                    }
                }
            }
        }
    }

    /// Parse one envelope and publish it. Returns true only when a book was
    /// actually updated; malformed or unmappable messages are skipped with
    /// no state change.
    fn apply_message(&self, raw: &str) -> bool {
        let Some(update) = parse_stream_message(raw) else {
            debug!("skipping malformed stream message");
            return false;
        };

        let Some(symbol) = self.mapper.canonical(&update.symbol) else {
            debug!(symbol = %update.symbol, "skipping unmappable venue symbol");
            return false;
        };

        self.store.upsert(&symbol, update.bids, update.asks);
        true
    }
}

struct BookUpdate {
    symbol: String,
    bids: Vec<Level>,
    asks: Vec<Level>,
}

#[derive(Debug, Deserialize)]
struct StreamEnvelope {
    #[serde(rename = "stream")]
    _stream: String,
    data: StreamPayload,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StreamPayload {
    Depth(DepthPayload),
    BookTicker(BookTickerPayload),
}

/// `{symbol}@depth5@100ms` payload: top-N levels as (price, qty) strings.
#[derive(Debug, Deserialize)]
struct DepthPayload {
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "b")]
    bids: Vec<(String, String)>,
    #[serde(rename = "a")]
    asks: Vec<(String, String)>,
}

/// `{symbol}@bookTicker` payload: best bid/ask only.
#[derive(Debug, Deserialize)]
struct BookTickerPayload {
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "b")]
    bid_price: String,
    #[serde(rename = "B")]
    bid_qty: String,
    #[serde(rename = "a")]
    ask_price: String,
    #[serde(rename = "A")]
    ask_qty: String,
}

/// True when the upgrade handshake was refused with HTTP 451, the status
/// venues use for geographic blocks. Only this error advances the
/// endpoint rotation; everything else retries the current endpoint.
fn is_geo_blocked(err: &WsError) -> bool {
    matches!(err, WsError::Http(resp) if resp.status() == StatusCode::UNAVAILABLE_FOR_LEGAL_REASONS)
}

fn parse_stream_message(raw: &str) -> Option<BookUpdate> {
    let envelope: StreamEnvelope = serde_json::from_str(raw).ok()?;

    match envelope.data {
        StreamPayload::Depth(depth) => Some(BookUpdate {
            symbol: depth.symbol,
            bids: parse_levels(&depth.bids)?,
            asks: parse_levels(&depth.asks)?,
        }),
        StreamPayload::BookTicker(tick) => Some(BookUpdate {
            symbol: tick.symbol,
            bids: parse_levels(&[(tick.bid_price, tick.bid_qty)])?,
            asks: parse_levels(&[(tick.ask_price, tick.ask_qty)])?,
        }),
    }
}

/// Parse wire levels. A level that fails to parse rejects the whole
/// message; non-positive levels are dropped individually.
fn parse_levels(entries: &[(String, String)]) -> Option<Vec<Level>> {
    let mut levels = Vec::with_capacity(entries.len());
    for (price, qty) in entries {
        let price = Decimal::from_str(price).ok()?;
        let qty = Decimal::from_str(qty).ok()?;
        if price > Decimal::ZERO && qty > Decimal::ZERO {
            levels.push(Level::new(price, qty));
        }
    }
    Some(levels)
}
