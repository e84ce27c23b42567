//! `SQLite` connection pool setup and migration runner.
//!
//! File databases are opened in WAL mode so the chamber manager can read while
//! a save is being written, and every connection waits on a locked database
//! instead of failing right away.

use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};

use crate::error::StorageError;

/// How long a connection waits for a lock held by another connection.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for the `SQLite` storage adapter.
#[derive(Debug, Clone)]
pub struct Config {
    /// `SQLite` connection URL (e.g. `sqlite:fermhub.db` or `sqlite::memory:`).
    pub database_url: String,
    pub busy_timeout: Duration,
}

impl Config {
    #[must_use]
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    /// Build a [`Database`] from this configuration.
    ///
    /// Creates the database file if missing, opens the pool and runs all
    /// pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the URL is malformed, or the connection or
    /// migrations fail.
    #[tracing::instrument(skip(self), fields(url = %self.database_url))]
    pub async fn build(self) -> Result<Database, StorageError> {
        let options = SqliteConnectOptions::from_str(&self.database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(self.busy_timeout);
        let pool = SqlitePool::connect_with(options).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::debug!("database ready");
        Ok(Database { pool })
    }
}

/// Holds the `SQLite` connection pool and provides access to it.
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Borrow the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close every connection of the pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
