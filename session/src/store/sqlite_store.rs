//! SQLite-backed implementation of `TradeStore`.
//!
//! Provides durable persistence of the core's observable output so that
//! opportunity and trade history survive restarts. Schema is created on
//! startup; the trading loop itself never blocks on reads.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::TradeStore;
use crate::model::{OpportunityRecord, TradeRecord};

pub struct SqliteTradeStore {
    pool: SqlitePool,
}

impl SqliteTradeStore {
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect and ensure the schema exists.
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        let pool = SqlitePool::connect(url).await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS opportunities (
                id TEXT PRIMARY KEY,
                triangle_hash TEXT NOT NULL,
                gross_bps DOUBLE PRECISION NOT NULL,
                net_bps DOUBLE PRECISION NOT NULL,
                notional_quote DOUBLE PRECISION NOT NULL,
                created_at TEXT NOT NULL
            );
        "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trades (
                id TEXT PRIMARY KEY,
                opportunity_id TEXT NOT NULL,
                details TEXT NOT NULL,
                pnl_quote DOUBLE PRECISION NOT NULL,
                created_at TEXT NOT NULL
            );
        "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            r#"CREATE INDEX IF NOT EXISTS idx_opportunities_triangle_hash
               ON opportunities(triangle_hash);"#,
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            r#"CREATE INDEX IF NOT EXISTS idx_trades_opportunity
               ON trades(opportunity_id);"#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl TradeStore for SqliteTradeStore {
    async fn record_opportunity(
        &self,
        triangle_hash: &str,
        gross_bps: f64,
        net_bps: f64,
        notional_quote: f64,
    ) -> anyhow::Result<Uuid> {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO opportunities (id, triangle_hash, gross_bps, net_bps, notional_quote, created_at)
            VALUES (?, ?, ?, ?, ?, ?);
        "#,
        )
        .bind(id.to_string())
        .bind(triangle_hash)
        .bind(gross_bps)
        .bind(net_bps)
        .bind(notional_quote)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    async fn record_trade(
        &self,
        opportunity_id: Uuid,
        details: serde_json::Value,
        pnl_quote: f64,
    ) -> anyhow::Result<Uuid> {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO trades (id, opportunity_id, details, pnl_quote, created_at)
            VALUES (?, ?, ?, ?, ?);
        "#,
        )
        .bind(id.to_string())
        .bind(opportunity_id.to_string())
        .bind(details.to_string())
        .bind(pnl_quote)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    async fn recent_opportunities(&self, limit: i64) -> anyhow::Result<Vec<OpportunityRecord>> {
        let rows = sqlx::query(
            r#"SELECT id, triangle_hash, gross_bps, net_bps, notional_quote, created_at
               FROM opportunities ORDER BY created_at DESC LIMIT ?;"#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut opportunities = Vec::with_capacity(rows.len());
        for row in rows {
            let id_str: String = row.get("id");

            opportunities.push(OpportunityRecord {
                id: Uuid::parse_str(&id_str)?,
                triangle_hash: row.get("triangle_hash"),
                gross_bps: row.get("gross_bps"),
                net_bps: row.get("net_bps"),
                notional_quote: row.get("notional_quote"),
                created_at: row.get::<DateTime<Utc>, _>("created_at"),
            });
        }

        Ok(opportunities)
    }

    async fn recent_trades(&self, limit: i64) -> anyhow::Result<Vec<TradeRecord>> {
        let rows = sqlx::query(
            r#"SELECT id, opportunity_id, details, pnl_quote, created_at
               FROM trades ORDER BY created_at DESC LIMIT ?;"#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut trades = Vec::with_capacity(rows.len());
        for row in rows {
            let id_str: String = row.get("id");
            let opportunity_id_str: String = row.get("opportunity_id");
            let details_str: String = row.get("details");

            trades.push(TradeRecord {
                id: Uuid::parse_str(&id_str)?,
                opportunity_id: Uuid::parse_str(&opportunity_id_str)?,
                details: serde_json::from_str(&details_str)?,
                pnl_quote: row.get("pnl_quote"),
                created_at: row.get::<DateTime<Utc>, _>("created_at"),
            });
        }

        Ok(trades)
    }
}
