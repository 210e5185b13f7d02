// =============================================================================
// SQLite PriceStore (sqlx)
// =============================================================================
//
// Two tables:
//   item_prices     — append-only observations, ordered by (timestamp, id)
//   item_analytics  — one row per item, replaced on every refresh
//
// Timestamps are stored as Unix milliseconds. Tables are created with
// `IF NOT EXISTS` on connect; there is no migration framework.
// =============================================================================

use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::{info, instrument};

use super::{PriceStore, StoreError, StoreResult};
use crate::types::{AnalyticsSnapshot, ItemId, Price, PricePoint};

#[derive(Clone)]
pub struct SqlitePriceStore {
    pool: SqlitePool,
}

impl SqlitePriceStore {
    /// Open (creating if missing) the database at `db_url`, e.g.
    /// `sqlite://flips.db`, and ensure the tables exist.
    pub async fn connect(db_url: &str) -> Result<Self> {
        if let Some(path_part) = db_url.strip_prefix("sqlite://") {
            if let Some(parent) = Path::new(path_part).parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .context("failed to create database directory")?;
                }
            }
        }

        let options = SqliteConnectOptions::from_str(db_url)
            .with_context(|| format!("invalid database url {db_url}"))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("failed to connect to SQLite database")?;

        info!(db_url = %db_url, "connected to price database");
        Self::from_pool(pool).await
    }

    /// Wrap an existing pool and ensure the tables exist.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        let store = Self { pool };
        store.init().await?;
        Ok(store)
    }

    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS item_prices (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                item_id INTEGER NOT NULL,
                timestamp INTEGER NOT NULL,
                buy_price INTEGER NOT NULL,
                sell_price INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to create item_prices table")?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_item_prices_item_time ON item_prices (item_id, timestamp, id);",
        )
        .execute(&self.pool)
        .await
        .context("failed to create item_prices index")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS item_analytics (
                item_id INTEGER PRIMARY KEY,
                sma5_buy REAL NOT NULL,
                sma5_sell REAL NOT NULL,
                rsi14 REAL NOT NULL,
                macd_line REAL NOT NULL,
                macd_signal REAL NOT NULL,
                macd_hist REAL NOT NULL,
                last_updated INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to create item_analytics table")?;

        Ok(())
    }
}

fn decode_timestamp(item_id: ItemId, millis: i64) -> StoreResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis).ok_or_else(|| StoreError::Corrupt {
        item_id,
        reason: format!("timestamp {millis} out of range"),
    })
}

fn row_to_price(item_id: ItemId, row: &SqliteRow) -> StoreResult<PricePoint> {
    Ok(PricePoint {
        item_id,
        timestamp: decode_timestamp(item_id, row.try_get("timestamp")?)?,
        buy_price: row.try_get("buy_price")?,
        sell_price: row.try_get("sell_price")?,
    })
}

fn row_to_snapshot(row: &SqliteRow) -> StoreResult<AnalyticsSnapshot> {
    let raw_id: i64 = row.try_get("item_id")?;
    let item_id = ItemId::try_from(raw_id).map_err(|_| StoreError::Corrupt {
        item_id: 0,
        reason: format!("item id {raw_id} out of range"),
    })?;

    Ok(AnalyticsSnapshot {
        item_id,
        sma5_buy: row.try_get("sma5_buy")?,
        sma5_sell: row.try_get("sma5_sell")?,
        rsi14: row.try_get("rsi14")?,
        macd_line: row.try_get("macd_line")?,
        macd_signal: row.try_get("macd_signal")?,
        macd_hist: row.try_get("macd_hist")?,
        last_updated: decode_timestamp(item_id, row.try_get("last_updated")?)?,
    })
}

#[async_trait]
impl PriceStore for SqlitePriceStore {
    async fn append_price_at(
        &self,
        item_id: ItemId,
        timestamp: DateTime<Utc>,
        buy_price: Price,
        sell_price: Price,
    ) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO item_prices (item_id, timestamp, buy_price, sell_price) VALUES (?, ?, ?, ?)",
        )
        .bind(i64::from(item_id))
        .bind(timestamp.timestamp_millis())
        .bind(buy_price)
        .bind(sell_price)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[instrument(skip(self), level = "debug", name = "sqlite::query_ascending")]
    async fn query_ascending(&self, item_id: ItemId) -> StoreResult<Vec<PricePoint>> {
        let rows = sqlx::query(
            "SELECT timestamp, buy_price, sell_price FROM item_prices WHERE item_id = ? ORDER BY timestamp ASC, id ASC",
        )
        .bind(i64::from(item_id))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(|row| row_to_price(item_id, row)).collect()
    }

    async fn query_recent_descending(&self, item_id: ItemId, limit: usize) -> StoreResult<Vec<PricePoint>> {
        let rows = sqlx::query(
            "SELECT timestamp, buy_price, sell_price FROM item_prices WHERE item_id = ? ORDER BY timestamp DESC, id DESC LIMIT ?",
        )
        .bind(i64::from(item_id))
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(|row| row_to_price(item_id, row)).collect()
    }

    #[instrument(skip(self, snapshot), fields(item_id = snapshot.item_id), level = "debug", name = "sqlite::upsert_snapshot")]
    async fn upsert_snapshot(&self, snapshot: &AnalyticsSnapshot) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO item_analytics
                (item_id, sma5_buy, sma5_sell, rsi14, macd_line, macd_signal, macd_hist, last_updated)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(item_id) DO UPDATE SET
                sma5_buy = excluded.sma5_buy,
                sma5_sell = excluded.sma5_sell,
                rsi14 = excluded.rsi14,
                macd_line = excluded.macd_line,
                macd_signal = excluded.macd_signal,
                macd_hist = excluded.macd_hist,
                last_updated = excluded.last_updated
            "#,
        )
        .bind(i64::from(snapshot.item_id))
        .bind(snapshot.sma5_buy)
        .bind(snapshot.sma5_sell)
        .bind(snapshot.rsi14)
        .bind(snapshot.macd_line)
        .bind(snapshot.macd_signal)
        .bind(snapshot.macd_hist)
        .bind(snapshot.last_updated.timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_snapshot(&self, item_id: ItemId) -> StoreResult<Option<AnalyticsSnapshot>> {
        let row = sqlx::query("SELECT * FROM item_analytics WHERE item_id = ?")
            .bind(i64::from(item_id))
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_snapshot).transpose()
    }

    async fn list_snapshots(&self) -> StoreResult<Vec<AnalyticsSnapshot>> {
        let rows = sqlx::query("SELECT * FROM item_analytics ORDER BY item_id ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_snapshot).collect()
    }
}
