use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tokio::fs;
use tracing::info;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS gas_prices (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT NOT NULL,
        gas_price REAL NOT NULL
    );
"#;

/// SQLite pool holding the gas price log.
#[derive(Clone)]
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    /// Opens (and creates if needed) the database at `db_url`, e.g. `sqlite://data/gas_data.db`.
    pub async fn new(db_url: &str) -> Result<Self> {
        if let Some(file) = db_url.strip_prefix("sqlite://")
            && let Some(dir) = Path::new(file).parent()
            && !dir.as_os_str().is_empty()
            && !dir.exists()
        {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create database directory {:?}", dir))?;
        }

        // WAL lets forecast reads proceed while the collector writes
        let options = SqliteConnectOptions::from_str(db_url)
            .with_context(|| format!("Invalid database URL: {}", db_url))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let db = Self::open(SqlitePoolOptions::new().max_connections(5), options).await?;
        info!("Gas price database ready at {}", db_url);
        Ok(db)
    }

    /// Private in-memory database. Pinned to a single connection that never
    /// expires, since every new SQLite connection would open an empty database.
    pub async fn in_memory() -> Result<Self> {
        let pool_options = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);

        Self::open(pool_options, SqliteConnectOptions::from_str("sqlite::memory:")?).await
    }

    async fn open(pool_options: SqlitePoolOptions, options: SqliteConnectOptions) -> Result<Self> {
        let pool = pool_options
            .connect_with(options)
            .await
            .context("Failed to open SQLite database")?;

        sqlx::query(SCHEMA)
            .execute(&pool)
            .await
            .context("Failed to create gas_prices table")?;

        Ok(Self { pool })
    }
}
