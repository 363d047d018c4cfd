use crate::domain::errors::ForecastError;
use crate::domain::repositories::PriceStore;
use crate::domain::types::Sample;
use crate::infrastructure::persistence::database::Database;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use sqlx::Row;
use tokio::sync::Mutex;
use tracing::debug;

/// SQLite-backed gas price log.
///
/// Rows live in `gas_prices (id, timestamp, gas_price)` with RFC 3339 UTC
/// timestamps at microsecond precision, ordered by `id`.
pub struct SqlitePriceStore {
    database: Database,
    write_lock: Mutex<()>,
}

impl SqlitePriceStore {
    pub fn new(database: Database) -> Self {
        Self {
            database,
            write_lock: Mutex::new(()),
        }
    }

    async fn latest_timestamp(&self) -> Result<Option<DateTime<Utc>>> {
        let row = sqlx::query("SELECT timestamp FROM gas_prices ORDER BY id DESC LIMIT 1")
            .fetch_optional(&self.database.pool)
            .await
            .context("Failed to read latest gas price")?;

        row.map(|r| parse_timestamp(r.try_get("timestamp")?))
            .transpose()
    }

    async fn insert(&self, timestamp: DateTime<Utc>, price: f64) -> Result<Sample> {
        let result = sqlx::query("INSERT INTO gas_prices (timestamp, gas_price) VALUES (?, ?)")
            .bind(timestamp.to_rfc3339_opts(SecondsFormat::Micros, true))
            .bind(price)
            .execute(&self.database.pool)
            .await
            .context("Failed to save gas price")?;

        let sample = Sample {
            id: result.last_insert_rowid(),
            timestamp,
            price,
        };
        debug!("Persisted gas price #{}: {} gwei", sample.id, price);
        Ok(sample)
    }
}

fn parse_timestamp(raw: String) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("Invalid stored timestamp: {}", raw))
}

fn validate_price(price: f64) -> Result<(), ForecastError> {
    if price.is_finite() && price > 0.0 {
        Ok(())
    } else {
        Err(ForecastError::InvalidPrice { price })
    }
}

fn map_rows(rows: Vec<sqlx::sqlite::SqliteRow>) -> Result<Vec<Sample>> {
    rows.into_iter()
        .map(|row| {
            Ok(Sample {
                id: row.try_get("id")?,
                timestamp: parse_timestamp(row.try_get("timestamp")?)?,
                price: row.try_get("gas_price")?,
            })
        })
        .collect()
}

#[async_trait]
impl PriceStore for SqlitePriceStore {
    async fn append(&self, price: f64) -> Result<Sample> {
        validate_price(price)?;
        let _guard = self.write_lock.lock().await;

        let mut timestamp = Utc::now().trunc_subsecs(6);
        if let Some(latest) = self.latest_timestamp().await?
            && timestamp <= latest
        {
            timestamp = latest + Duration::microseconds(1);
        }

        self.insert(timestamp, price).await
    }

    async fn append_at(&self, timestamp: DateTime<Utc>, price: f64) -> Result<Sample> {
        validate_price(price)?;
        let timestamp = timestamp.trunc_subsecs(6);
        let _guard = self.write_lock.lock().await;

        if let Some(latest) = self.latest_timestamp().await?
            && timestamp <= latest
        {
            return Err(ForecastError::InvalidOrder {
                index: self.count().await?,
                previous: latest,
                timestamp,
            }
            .into());
        }

        self.insert(timestamp, price).await
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Sample>> {
        let rows = sqlx::query(
            "SELECT id, timestamp, gas_price FROM gas_prices ORDER BY id DESC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.database.pool)
        .await
        .context("Failed to fetch recent gas prices")?;

        map_rows(rows)
    }

    async fn recent_oldest_first(&self, limit: usize) -> Result<Vec<Sample>> {
        let mut samples = self.recent(limit).await?;
        samples.reverse();
        Ok(samples)
    }

    async fn count(&self) -> Result<usize> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM gas_prices")
            .fetch_one(&self.database.pool)
            .await?;
        let count: i64 = row.try_get("count")?;
        Ok(count as usize)
    }
}
