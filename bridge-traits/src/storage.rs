//! Storage Abstractions
//!
//! Provides platform-agnostic traits for the two kinds of persistence the
//! proxy needs:
//! - [`CacheStorage`]: named partitions of stored responses (Cache API,
//!   SQLite, in-memory)
//! - [`SettingsStore`]: a small durable key-value record store

use async_trait::async_trait;
use std::fmt;

use crate::error::Result;
use crate::http::{HttpMethod, HttpResponse};

/// Identity of a stored response inside a partition.
///
/// The URL is stored already normalized by the caller (fragment removed);
/// storage implementations compare keys by exact equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub method: HttpMethod,
    pub url: String,
}

impl CacheKey {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// Partitioned response storage trait
///
/// Abstracts the host's response cache:
/// - Web: Cache Storage API (`caches.open(name)`)
/// - Desktop: SQLite table keyed by partition name
/// - Tests: in-memory maps
///
/// # Ordering
///
/// [`keys`](CacheStorage::keys) must return entries oldest-first. Writing a key
/// that already exists replaces the stored response and moves the entry to the
/// newest position.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::{CacheKey, CacheStorage};
///
/// async fn oldest(storage: &dyn CacheStorage) -> Result<Option<CacheKey>> {
///     Ok(storage.keys("data-cache-v1").await?.into_iter().next())
/// }
/// ```
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the partition if it does not exist yet.
    async fn open(&self, partition: &str) -> Result<()>;

    /// Names of every partition currently present.
    async fn partition_names(&self) -> Result<Vec<String>>;

    /// Delete a partition and all of its entries.
    ///
    /// Returns `false` if the partition did not exist.
    async fn delete_partition(&self, partition: &str) -> Result<bool>;

    /// All keys in a partition, oldest insertion first.
    ///
    /// A missing partition yields an empty list.
    async fn keys(&self, partition: &str) -> Result<Vec<CacheKey>>;

    /// Exact-key lookup.
    async fn get(&self, partition: &str, key: &CacheKey) -> Result<Option<HttpResponse>>;

    /// Insert or replace an entry, creating the partition if needed.
    async fn put(&self, partition: &str, key: &CacheKey, response: &HttpResponse) -> Result<()>;

    /// Remove an entry. Returns `false` if nothing was removed.
    async fn delete(&self, partition: &str, key: &CacheKey) -> Result<bool>;
}

/// Key-value settings storage trait
///
/// Abstracts platform-specific durable record storage:
/// - Web: IndexedDB object store
/// - Desktop: SQLite-backed key-value table
/// - Mobile: UserDefaults / DataStore
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::SettingsStore;
///
/// async fn save_record(store: &dyn SettingsStore, json: &str) -> Result<()> {
///     store.set_string("offline-cache-config", json).await
/// }
/// ```
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Store a string value
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a string value
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Delete a setting
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if a setting exists
    async fn has_key(&self, key: &str) -> Result<bool> {
        Ok(self.get_string(key).await?.is_some())
    }

    /// List all setting keys
    async fn list_keys(&self) -> Result<Vec<String>>;

    /// Clear all settings
    async fn clear_all(&self) -> Result<()>;
}
