//! # Partitioned Response Store
//!
//! Two named partitions over a [`CacheStorage`] bridge. The shell partition
//! holds the application shell and navigation pages; the data partition holds
//! everything written at runtime and is the only one subject to eviction.

use bridge_traits::{CacheKey, CacheStorage, HttpResponse};
use core_runtime::config::PartitionNames;
use core_runtime::logging::strip_query;
use futures::future::join_all;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    Shell,
    Data,
}

impl Partition {
    pub const SHELL_THEN_DATA: [Partition; 2] = [Partition::Shell, Partition::Data];
    pub const DATA_THEN_SHELL: [Partition; 2] = [Partition::Data, Partition::Shell];
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Partition::Shell => f.write_str("shell"),
            Partition::Data => f.write_str("data"),
        }
    }
}

/// Why a response was not written. Skipping is a normal outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotOk(u16),
    NotGet,
    ContentType,
    TooLarge,
    CeilingReached,
    AudioDisabled,
    WriteFailed,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotOk(status) => write!(f, "status {}", status),
            SkipReason::NotGet => f.write_str("not a GET request"),
            SkipReason::ContentType => f.write_str("content type not cacheable"),
            SkipReason::TooLarge => f.write_str("response too large"),
            SkipReason::CeilingReached => f.write_str("count ceiling reached"),
            SkipReason::AudioDisabled => f.write_str("audio caching disabled"),
            SkipReason::WriteFailed => f.write_str("storage write failed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    Stored,
    Skipped(SkipReason),
}

impl StoreOutcome {
    pub fn is_stored(&self) -> bool {
        matches!(self, StoreOutcome::Stored)
    }
}

#[derive(Clone)]
pub struct PartitionedStore {
    storage: Arc<dyn CacheStorage>,
    names: PartitionNames,
}

impl fmt::Debug for PartitionedStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartitionedStore")
            .field("names", &self.names)
            .finish_non_exhaustive()
    }
}

impl PartitionedStore {
    pub fn new(storage: Arc<dyn CacheStorage>, names: PartitionNames) -> Self {
        Self { storage, names }
    }

    pub fn name(&self, partition: Partition) -> &str {
        match partition {
            Partition::Shell => &self.names.shell,
            Partition::Data => &self.names.data,
        }
    }

    pub fn is_recognized(&self, name: &str) -> bool {
        name == self.names.shell || name == self.names.data
    }

    /// Create both partitions if they do not exist yet.
    pub async fn open_all(&self) -> Result<()> {
        self.storage.open(&self.names.shell).await?;
        self.storage.open(&self.names.data).await?;
        Ok(())
    }

    pub async fn get(&self, partition: Partition, key: &CacheKey) -> Result<Option<HttpResponse>> {
        Ok(self.storage.get(self.name(partition), key).await?)
    }

    /// Exact match first, then the oldest entry whose URL equals `key` once
    /// query and fragment are stripped.
    pub async fn match_ignoring_search(
        &self,
        partition: Partition,
        key: &CacheKey,
    ) -> Result<Option<HttpResponse>> {
        if let Some(hit) = self.get(partition, key).await? {
            return Ok(Some(hit));
        }

        let wanted = strip_query(&key.url);
        let name = self.name(partition);
        for candidate in self.storage.keys(name).await? {
            if candidate.method == key.method && strip_query(&candidate.url) == wanted {
                if let Some(hit) = self.storage.get(name, &candidate).await? {
                    return Ok(Some(hit));
                }
            }
        }
        Ok(None)
    }

    /// First hit across `order`. Storage errors on one partition are logged
    /// and the next partition is tried.
    pub async fn lookup(
        &self,
        order: &[Partition],
        key: &CacheKey,
        ignore_search: bool,
    ) -> Option<(Partition, HttpResponse)> {
        for &partition in order {
            let found = if ignore_search {
                self.match_ignoring_search(partition, key).await
            } else {
                self.get(partition, key).await
            };

            match found {
                Ok(Some(response)) => {
                    debug!(partition = %partition, key = %key, "Cache hit");
                    return Some((partition, response));
                }
                Ok(None) => {}
                Err(e) => warn!(partition = %partition, key = %key, error = %e, "Cache read failed"),
            }
        }
        None
    }

    /// Write (or overwrite) an entry; an existing key moves to the newest position.
    pub async fn put(
        &self,
        partition: Partition,
        key: &CacheKey,
        response: &HttpResponse,
    ) -> Result<()> {
        self.storage.put(self.name(partition), key, response).await?;
        debug!(partition = %partition, key = %key, bytes = response.body.len(), "Stored response");
        Ok(())
    }

    pub async fn delete(&self, partition: Partition, key: &CacheKey) -> Result<bool> {
        Ok(self.storage.delete(self.name(partition), key).await?)
    }

    /// Keys oldest first.
    pub async fn keys(&self, partition: Partition) -> Result<Vec<CacheKey>> {
        Ok(self.storage.keys(self.name(partition)).await?)
    }

    /// Every partition present in storage, including unrecognized ones.
    pub async fn partition_names(&self) -> Result<Vec<String>> {
        Ok(self.storage.partition_names().await?)
    }

    /// Keys and snapshot of an arbitrary partition by name (diagnostics).
    pub async fn keys_by_name(&self, name: &str) -> Result<Vec<CacheKey>> {
        Ok(self.storage.keys(name).await?)
    }

    pub async fn get_by_name(&self, name: &str, key: &CacheKey) -> Result<Option<HttpResponse>> {
        Ok(self.storage.get(name, key).await?)
    }

    /// Remove every partition that is neither shell nor data. Returns the
    /// names that were deleted.
    pub async fn delete_unrecognized(&self) -> Result<Vec<String>> {
        let stale: Vec<String> = self
            .partition_names()
            .await?
            .into_iter()
            .filter(|name| !self.is_recognized(name))
            .collect();

        Ok(self.delete_partitions(stale).await)
    }

    /// Remove every partition, recognized or not.
    pub async fn clear_all(&self) -> Result<Vec<String>> {
        let names = self.partition_names().await?;
        Ok(self.delete_partitions(names).await)
    }

    async fn delete_partitions(&self, names: Vec<String>) -> Vec<String> {
        let results = join_all(names.iter().map(|name| self.storage.delete_partition(name))).await;

        names
            .into_iter()
            .zip(results)
            .filter_map(|(name, result)| match result {
                Ok(true) => Some(name),
                Ok(false) => None,
                Err(e) => {
                    warn!(partition = %name, error = %e, "Failed to delete partition");
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_desktop::MemoryCacheStorage;

    fn store() -> PartitionedStore {
        PartitionedStore::new(Arc::new(MemoryCacheStorage::new()), PartitionNames::default())
    }

    fn ok(body: &'static str) -> HttpResponse {
        HttpResponse::new(200)
            .with_header("Content-Type", "application/json")
            .with_body(body)
    }

    #[tokio::test]
    async fn test_round_trip_is_byte_identical() {
        let store = store();
        let key = CacheKey::get("https://example.com/app/data.json?t=1");
        let response = ok("{\"a\":1}");

        store.put(Partition::Data, &key, &response).await.unwrap();

        let exact = store.get(Partition::Data, &key).await.unwrap().unwrap();
        assert_eq!(exact, response);

        let loose = store
            .match_ignoring_search(Partition::Data, &CacheKey::get("https://example.com/app/data.json?t=2"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loose.status, 200);
        assert_eq!(loose.body, response.body);
    }

    #[tokio::test]
    async fn test_lookup_respects_order() {
        let store = store();
        let key = CacheKey::get("https://example.com/app/a.css");

        store.put(Partition::Data, &key, &ok("data")).await.unwrap();
        store.put(Partition::Shell, &key, &ok("shell")).await.unwrap();

        let (partition, response) = store.lookup(&Partition::SHELL_THEN_DATA, &key, false).await.unwrap();
        assert_eq!(partition, Partition::Shell);
        assert_eq!(&response.body[..], b"shell");

        let (partition, _) = store.lookup(&Partition::DATA_THEN_SHELL, &key, false).await.unwrap();
        assert_eq!(partition, Partition::Data);

        let missing = CacheKey::get("https://example.com/app/b.css");
        assert!(store.lookup(&Partition::SHELL_THEN_DATA, &missing, true).await.is_none());
    }

    #[tokio::test]
    async fn test_exact_lookup_ignores_other_queries() {
        let store = store();
        store
            .put(Partition::Data, &CacheKey::get("https://example.com/api?page=1"), &ok("1"))
            .await
            .unwrap();

        let other = CacheKey::get("https://example.com/api?page=2");
        assert!(store.lookup(&[Partition::Data], &other, false).await.is_none());
        assert!(store.lookup(&[Partition::Data], &other, true).await.is_some());
    }

    #[tokio::test]
    async fn test_reput_moves_to_newest() {
        let store = store();
        let a = CacheKey::get("https://example.com/a");
        let b = CacheKey::get("https://example.com/b");

        store.put(Partition::Data, &a, &ok("1")).await.unwrap();
        store.put(Partition::Data, &b, &ok("2")).await.unwrap();
        store.put(Partition::Data, &a, &ok("3")).await.unwrap();

        assert_eq!(store.keys(Partition::Data).await.unwrap(), vec![b, a]);
    }

    #[tokio::test]
    async fn test_delete_unrecognized_keeps_current_partitions() {
        let storage = Arc::new(MemoryCacheStorage::new());
        let store = PartitionedStore::new(storage.clone(), PartitionNames::default());

        store.open_all().await.unwrap();
        storage.open("app-shell-v0").await.unwrap();
        storage.open("scratch").await.unwrap();

        let mut deleted = store.delete_unrecognized().await.unwrap();
        deleted.sort();
        assert_eq!(deleted, vec!["app-shell-v0".to_string(), "scratch".to_string()]);

        let mut remaining = store.partition_names().await.unwrap();
        remaining.sort();
        assert_eq!(remaining, vec!["app-shell-v1".to_string(), "data-cache-v1".to_string()]);
    }

    #[tokio::test]
    async fn test_clear_all() {
        let store = store();
        store
            .put(Partition::Shell, &CacheKey::get("https://example.com/"), &ok("x"))
            .await
            .unwrap();
        store
            .put(Partition::Data, &CacheKey::get("https://example.com/y"), &ok("y"))
            .await
            .unwrap();

        assert_eq!(store.clear_all().await.unwrap().len(), 2);
        assert!(store.partition_names().await.unwrap().is_empty());
    }
}
