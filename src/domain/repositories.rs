//! Storage contract for observed gas prices.
//!
//! `PriceStore` is an append-only log of `(timestamp, price)` samples; the
//! forecasting code only ever sees it through this trait.
//!
//! # Implementations
//!
//! - `SqlitePriceStore`: durable storage through sqlx (production)
//! - `InMemoryPriceStore`: `Arc<RwLock>` backed storage (tests, dry runs)
//!
//! # Example
//!
//! ```rust,no_run
//! use gasoracle::domain::repositories::PriceStore;
//! use gasoracle::infrastructure::InMemoryPriceStore;
//!
//! # async {
//! let store = InMemoryPriceStore::new();
//! store.append(21.5).await?;
//! let latest = store.recent(5).await?;
//! # Ok::<(), anyhow::Error>(())
//! # };
//! ```

use crate::domain::types::Sample;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Durable, append-only store of gas price samples.
///
/// Writes are serialized; a read observes every append that completed before it started.
#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Stamp `price` with the current UTC instant and persist it.
    /// The sample is visible to reads once this returns.
    async fn append(&self, price: f64) -> Result<Sample>;

    /// Persist `price` at an explicit instant, which must be strictly after the latest stored one.
    async fn append_at(&self, timestamp: DateTime<Utc>, price: f64) -> Result<Sample>;

    /// Up to `limit` samples, most recent first.
    async fn recent(&self, limit: usize) -> Result<Vec<Sample>>;

    /// Up to `limit` most recent samples, oldest first.
    async fn recent_oldest_first(&self, limit: usize) -> Result<Vec<Sample>>;

    /// Number of stored samples.
    async fn count(&self) -> Result<usize>;
}
