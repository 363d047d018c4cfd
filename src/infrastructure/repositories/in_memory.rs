//! In-Memory Price Store
//!
//! Thread-safe, in-memory implementation of the `PriceStore` trait defined in
//! `domain::repositories`.
//!
//! # Features
//!
//! - **Thread-safe**: Uses `Arc<RwLock>` for concurrent access
//! - **Testing**: Ideal for unit tests and dry runs
//!
//! # Limitations
//!
//! - Data is lost on application restart
//!
//! For durable storage use `SqlitePriceStore`.

use crate::domain::errors::ForecastError;
use crate::domain::repositories::PriceStore;
use crate::domain::types::Sample;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory implementation of PriceStore
pub struct InMemoryPriceStore {
    samples: Arc<RwLock<Vec<Sample>>>,
}

impl InMemoryPriceStore {
    pub fn new() -> Self {
        Self {
            samples: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl Default for InMemoryPriceStore {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_price(price: f64) -> Result<(), ForecastError> {
    if price.is_finite() && price > 0.0 {
        Ok(())
    } else {
        Err(ForecastError::InvalidPrice { price })
    }
}

fn push(samples: &mut Vec<Sample>, timestamp: DateTime<Utc>, price: f64) -> Sample {
    let sample = Sample {
        id: samples.last().map_or(1, |s| s.id + 1),
        timestamp,
        price,
    };
    samples.push(sample);
    sample
}

#[async_trait]
impl PriceStore for InMemoryPriceStore {
    async fn append(&self, price: f64) -> Result<Sample> {
        validate_price(price)?;
        // The write guard serializes appenders
        let mut samples = self.samples.write().await;

        let mut timestamp = Utc::now();
        if let Some(latest) = samples.last()
            && timestamp <= latest.timestamp
        {
            timestamp = latest.timestamp + Duration::microseconds(1);
        }

        Ok(push(&mut samples, timestamp, price))
    }

    async fn append_at(&self, timestamp: DateTime<Utc>, price: f64) -> Result<Sample> {
        validate_price(price)?;
        let mut samples = self.samples.write().await;

        if let Some(latest) = samples.last()
            && timestamp <= latest.timestamp
        {
            return Err(ForecastError::InvalidOrder {
                index: samples.len(),
                previous: latest.timestamp,
                timestamp,
            }
            .into());
        }

        Ok(push(&mut samples, timestamp, price))
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Sample>> {
        let samples = self.samples.read().await;
        Ok(samples.iter().rev().take(limit).copied().collect())
    }

    async fn recent_oldest_first(&self, limit: usize) -> Result<Vec<Sample>> {
        let samples = self.samples.read().await;
        let start = samples.len().saturating_sub(limit);
        Ok(samples[start..].to_vec())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.samples.read().await.len())
    }
}
