//! Message storage.
//!
//! Each concern has its own trait ([`MessageStore`], [`CursorCacheStore`]) so
//! the pagination engine can run against any backend. [`SqlStore`] is the
//! SQLite implementation; [`crate::memory::MemoryStore`] keeps everything in
//! process.
//!
//! All trait methods use `impl Future` in their signatures (stable since Rust
//! 1.75) so no extra `async-trait` crate is required.

pub mod cursor_cache;
pub mod dao;
pub mod message;

pub use cursor_cache::{CacheWrite, CursorCacheStore};
pub use dao::{CursorCacheEntry, Message, StoredMessage};
pub use message::{MessageQuery, MessageStore, Seek};

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use crate::error::StoreError;

/// Everything the pagination engine and append path need from storage.
pub trait ChatStore: MessageStore + CursorCacheStore {}

impl<T: MessageStore + CursorCacheStore> ChatStore for T {}

/// Connection pool sizing.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_connections: u32,
    /// Idle connections above the minimum are closed after this long.
    pub idle_timeout: Option<Duration>,
    /// Connections are recycled after this long regardless of use.
    pub max_lifetime: Option<Duration>,
    pub acquire_timeout: Duration,
    /// How long a writer waits on a locked database file.
    pub busy_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 50,
            idle_timeout: Some(Duration::from_secs(10 * 60)),
            max_lifetime: Some(Duration::from_secs(15 * 60)),
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// SQLite-backed chat store.
#[derive(Clone, Debug)]
pub struct SqlStore {
    pool: SqlitePool,
}

impl SqlStore {
    /// Open (or create) the SQLite database at `url` and run pending migrations.
    ///
    /// `url` should be a sqlx-compatible SQLite URL, e.g. `"sqlite://imchat.db"`
    /// or `"sqlite::memory:"` for tests. An in-memory database lives only as
    /// long as its connection, so it is pinned to one connection that is
    /// never recycled.
    pub async fn connect(url: &str, config: &PoolConfig) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .busy_timeout(config.busy_timeout);

        let pool = if is_memory_url(url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .acquire_timeout(config.acquire_timeout)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(config.max_connections)
                .idle_timeout(config.idle_timeout)
                .max_lifetime(config.max_lifetime)
                .acquire_timeout(config.acquire_timeout)
                .connect_with(options.journal_mode(SqliteJournalMode::Wal))
                .await?
        };

        // Path is resolved relative to CARGO_MANIFEST_DIR at compile time.
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!(max_connections = config.max_connections, "chat store ready");
        Ok(Self { pool })
    }

    /// Fresh private in-memory database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        Self::connect("sqlite::memory:", &PoolConfig::default()).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Round-trip a trivial query to prove the database answers.
    pub async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Wait for in-flight queries and close every connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

pub(crate) fn to_sql(field: &'static str, value: u64) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::OutOfRange { field, value })
}

pub(crate) fn from_sql(field: &'static str, value: i64) -> Result<u64, StoreError> {
    u64::try_from(value).map_err(|_| StoreError::Corrupt { field, value })
}
