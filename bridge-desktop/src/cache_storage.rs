//! Partitioned response storage using SQLite

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpMethod, HttpResponse},
    storage::{CacheKey, CacheStorage},
};
use bytes::Bytes;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions},
    Row,
};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

const SCHEMA: [&str; 2] = [
    r#"
    CREATE TABLE IF NOT EXISTS cache_partitions (
        name TEXT PRIMARY KEY,
        created_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS cache_entries (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        partition TEXT NOT NULL,
        method TEXT NOT NULL,
        url TEXT NOT NULL,
        status INTEGER NOT NULL,
        headers TEXT NOT NULL,
        body BLOB NOT NULL,
        UNIQUE (partition, method, url)
    )
    "#,
];

/// SQLite-backed [`CacheStorage`].
///
/// Entries carry an autoincrement sequence number; `keys` orders by it, and
/// a replacing `put` deletes then re-inserts so the entry becomes the newest.
pub struct SqliteCacheStorage {
    pool: SqlitePool,
}

impl SqliteCacheStorage {
    /// Open (or create) the cache database at `db_path`.
    pub async fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(BridgeError::Io)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| BridgeError::Storage(format!("Failed to open cache DB: {}", e)))?;

        Self::init(&pool).await?;
        debug!(path = ?db_path, "Initialized cache storage");

        Ok(Self { pool })
    }

    /// Single-connection in-memory database (for testing)
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| BridgeError::Storage(format!("Failed to open cache DB: {}", e)))?;

        Self::init(&pool).await?;
        Ok(Self { pool })
    }

    /// `<platform cache dir>/offline-cache-proxy/responses.db`
    pub fn default_path() -> Result<PathBuf> {
        dirs::cache_dir()
            .map(|dir| dir.join("offline-cache-proxy").join("responses.db"))
            .ok_or_else(|| BridgeError::NotAvailable("platform cache directory".to_string()))
    }

    async fn init(pool: &SqlitePool) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(pool)
                .await
                .map_err(|e| BridgeError::Storage(format!("Failed to create schema: {}", e)))?;
        }
        Ok(())
    }

    fn now() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default()
    }
}

fn storage_err(context: &'static str) -> impl Fn(sqlx::Error) -> BridgeError {
    move |e| BridgeError::Storage(format!("{}: {}", context, e))
}

#[async_trait]
impl CacheStorage for SqliteCacheStorage {
    async fn open(&self, partition: &str) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO cache_partitions (name, created_at) VALUES (?, ?)")
            .bind(partition)
            .bind(Self::now())
            .execute(&self.pool)
            .await
            .map_err(storage_err("Failed to open partition"))?;
        Ok(())
    }

    async fn partition_names(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT name FROM cache_partitions ORDER BY created_at, name")
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err("Failed to list partitions"))?;

        Ok(rows.into_iter().map(|row| row.get(0)).collect())
    }

    async fn delete_partition(&self, partition: &str) -> Result<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(storage_err("Failed to begin transaction"))?;

        sqlx::query("DELETE FROM cache_entries WHERE partition = ?")
            .bind(partition)
            .execute(&mut *tx)
            .await
            .map_err(storage_err("Failed to delete entries"))?;

        let removed = sqlx::query("DELETE FROM cache_partitions WHERE name = ?")
            .bind(partition)
            .execute(&mut *tx)
            .await
            .map_err(storage_err("Failed to delete partition"))?
            .rows_affected();

        tx.commit()
            .await
            .map_err(storage_err("Failed to commit partition delete"))?;

        debug!(partition, removed = removed > 0, "Deleted cache partition");
        Ok(removed > 0)
    }

    async fn keys(&self, partition: &str) -> Result<Vec<CacheKey>> {
        let rows = sqlx::query("SELECT method, url FROM cache_entries WHERE partition = ? ORDER BY seq")
            .bind(partition)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err("Failed to list keys"))?;

        rows.into_iter()
            .map(|row| {
                let method: String = row.get("method");
                let url: String = row.get("url");
                Ok(CacheKey::new(method.parse::<HttpMethod>()?, url))
            })
            .collect()
    }

    async fn get(&self, partition: &str, key: &CacheKey) -> Result<Option<HttpResponse>> {
        let row = sqlx::query(
            "SELECT status, headers, body FROM cache_entries WHERE partition = ? AND method = ? AND url = ?",
        )
        .bind(partition)
        .bind(key.method.as_str())
        .bind(&key.url)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err("Failed to read entry"))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let status: i64 = row.get("status");
        let headers: String = row.get("headers");
        let body: Vec<u8> = row.get("body");
        let headers: HashMap<String, String> = serde_json::from_str(&headers)
            .map_err(|e| BridgeError::Storage(format!("Corrupt stored headers: {}", e)))?;

        Ok(Some(HttpResponse {
            status: status as u16,
            headers,
            body: Bytes::from(body),
        }))
    }

    async fn put(&self, partition: &str, key: &CacheKey, response: &HttpResponse) -> Result<()> {
        let headers = serde_json::to_string(&response.headers)
            .map_err(|e| BridgeError::Storage(format!("Failed to encode headers: {}", e)))?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(storage_err("Failed to begin transaction"))?;

        sqlx::query("INSERT OR IGNORE INTO cache_partitions (name, created_at) VALUES (?, ?)")
            .bind(partition)
            .bind(Self::now())
            .execute(&mut *tx)
            .await
            .map_err(storage_err("Failed to open partition"))?;

        sqlx::query("DELETE FROM cache_entries WHERE partition = ? AND method = ? AND url = ?")
            .bind(partition)
            .bind(key.method.as_str())
            .bind(&key.url)
            .execute(&mut *tx)
            .await
            .map_err(storage_err("Failed to replace entry"))?;

        sqlx::query(
            "INSERT INTO cache_entries (partition, method, url, status, headers, body) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(partition)
        .bind(key.method.as_str())
        .bind(&key.url)
        .bind(response.status as i64)
        .bind(headers)
        .bind(response.body.as_ref())
        .execute(&mut *tx)
        .await
        .map_err(storage_err("Failed to write entry"))?;

        tx.commit()
            .await
            .map_err(storage_err("Failed to commit entry"))?;

        debug!(partition, key = %key, bytes = response.body.len(), "Stored response");
        Ok(())
    }

    async fn delete(&self, partition: &str, key: &CacheKey) -> Result<bool> {
        let removed =
            sqlx::query("DELETE FROM cache_entries WHERE partition = ? AND method = ? AND url = ?")
                .bind(partition)
                .bind(key.method.as_str())
                .bind(&key.url)
                .execute(&self.pool)
                .await
                .map_err(storage_err("Failed to delete entry"))?
                .rows_affected();

        Ok(removed > 0)
    }
}
