//! Binance spot REST adapter.
//!
//! Market metadata (`/api/v3/exchangeInfo`) is loaded once through an
//! async handle; every capability call awaits readiness before touching
//! the venue, and the triangle discovery path reads the same metadata.
//! Account and order endpoints are signed with HMAC-SHA256 over the query
//! string per the venue's authentication scheme.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::header::CONTENT_TYPE;
use rust_decimal::Decimal;
use serde::Deserialize;
use sha2::Sha256;
use tokio::sync::OnceCell;
use tracing::info;

use common::time::now_ms;
use engine::fees::FeeTable;
use engine::triangle::Listing;

use crate::adapter::{ExchangeAdapter, ExchangeError, OrderAck, OrderInstruction, Side};

type HmacSha256 = Hmac<Sha256>;

const DEFAULT_REST_URL: &str = "https://api.binance.com";
const RECV_WINDOW_MS: u64 = 5_000;

#[derive(Debug, Clone, Default)]
pub struct BinanceCredentials {
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
}

pub struct BinanceAdapter {
    http: reqwest::Client,
    rest_url: String,
    credentials: BinanceCredentials,
    taker_fee: Decimal,
    markets: OnceCell<Vec<Listing>>,
}

impl BinanceAdapter {
    pub fn new(rest_url: Option<String>, credentials: BinanceCredentials, fees: &FeeTable) -> Self {
        Self {
            http: reqwest::Client::new(),
            rest_url: rest_url.unwrap_or_else(|| DEFAULT_REST_URL.to_string()),
            credentials,
            taker_fee: fees.taker_fee("binance"),
            markets: OnceCell::new(),
        }
    }

    /// Tradable listings, loaded on first use and cached for the process
    /// lifetime. Also feeds the discovery-mode triangle enumerator.
    pub async fn markets(&self) -> Result<&[Listing], ExchangeError> {
        self.markets
            .get_or_try_init(|| self.load_markets())
            .await
            .map(Vec::as_slice)
    }

    async fn load_markets(&self) -> Result<Vec<Listing>, ExchangeError> {
        let url = format!("{}/api/v3/exchangeInfo", self.rest_url);
        let resp = check_status(self.http.get(&url).send().await?).await?;
        let info: ExchangeInfo = resp.json().await?;

        let listings = info
            .symbols
            .into_iter()
            .filter(|symbol| symbol.status == "TRADING")
            .map(|symbol| Listing {
                symbol: format!("{}/{}", symbol.base_asset, symbol.quote_asset),
                base: symbol.base_asset,
                quote: symbol.quote_asset,
            })
            .collect();

        info!("exchange metadata loaded");
        Ok(listings)
    }

    fn api_key(&self) -> Result<&str, ExchangeError> {
        self.credentials
            .api_key
            .as_deref()
            .ok_or(ExchangeError::MissingCredentials)
    }

    fn sign(&self, query: &str) -> Result<String, ExchangeError> {
        let secret = self
            .credentials
            .api_secret
            .as_deref()
            .ok_or(ExchangeError::MissingCredentials)?;

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| ExchangeError::Signature)?;
        mac.update(query.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    async fn place_market_order(
        &self,
        order: &OrderInstruction,
    ) -> Result<OrderAck, ExchangeError> {
        let api_key = self.api_key()?;

        let venue_symbol = order.symbol.replace('/', "");
        let side = match order.side {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        };
        let query = format!(
            "symbol={}&side={}&type=MARKET&quantity={}&recvWindow={}&timestamp={}",
            venue_symbol,
            side,
            order.amount,
            RECV_WINDOW_MS,
            now_ms()
        );
        let signature = self.sign(&query)?;

        let url = format!("{}/api/v3/order", self.rest_url);
        let resp = self
            .http
            .post(&url)
            .header("X-MBX-APIKEY", api_key)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(format!("{query}&signature={signature}"))
            .send()
            .await?;
        let resp = check_status(resp).await?;
        let ack: NewOrderResponse = resp.json().await?;

        info!(symbol = %order.symbol, side, order_id = ack.order_id, "order accepted");
        Ok(OrderAck {
            order_id: ack.order_id.to_string(),
            symbol: order.symbol.clone(),
            status: ack.status,
        })
    }
}

#[async_trait]
impl ExchangeAdapter for BinanceAdapter {
    async fn fetch_balances(&self) -> Result<HashMap<String, Decimal>, ExchangeError> {
        self.markets().await?;
        let api_key = self.api_key()?;

        let query = format!("recvWindow={}&timestamp={}", RECV_WINDOW_MS, now_ms());
        let signature = self.sign(&query)?;
        let url = format!(
            "{}/api/v3/account?{}&signature={}",
            self.rest_url, query, signature
        );

        let resp = check_status(
            self.http
                .get(&url)
                .header("X-MBX-APIKEY", api_key)
                .send()
                .await?,
        )
        .await?;
        let account: AccountInfo = resp.json().await?;

        Ok(account
            .balances
            .into_iter()
            .filter_map(|balance| {
                let free = Decimal::from_str(&balance.free).ok()?;
                Some((balance.asset, free))
            })
            .collect())
    }

    async fn create_bulk_orders(
        &self,
        orders: Vec<OrderInstruction>,
    ) -> Result<Vec<OrderAck>, ExchangeError> {
        self.markets().await?;

        let submissions = orders.iter().map(|order| self.place_market_order(order));
        futures::future::join_all(submissions)
            .await
            .into_iter()
            .collect()
    }

    fn fee_rate(&self, _symbol: &str) -> Decimal {
        self.taker_fee
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ExchangeError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Err(ExchangeError::Api { status, body })
}

#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymbolInfo {
    base_asset: String,
    quote_asset: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct AccountInfo {
    balances: Vec<AssetBalance>,
}

#[derive(Debug, Deserialize)]
struct AssetBalance {
    asset: String,
    free: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewOrderResponse {
    order_id: u64,
    status: String,
}
