//! In-memory partitioned response storage

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    http::HttpResponse,
    storage::{CacheKey, CacheStorage},
};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Volatile [`CacheStorage`] for tests and short-lived hosts.
///
/// Each partition is a `Vec` kept in insertion order, so `keys` is oldest
/// first without extra bookkeeping.
#[derive(Default)]
pub struct MemoryCacheStorage {
    partitions: RwLock<HashMap<String, Vec<(CacheKey, HttpResponse)>>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries in a partition (0 if absent).
    pub async fn len(&self, partition: &str) -> usize {
        self.partitions
            .read()
            .await
            .get(partition)
            .map_or(0, Vec::len)
    }

    pub async fn is_empty(&self, partition: &str) -> bool {
        self.len(partition).await == 0
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, partition: &str) -> Result<()> {
        self.partitions
            .write()
            .await
            .entry(partition.to_string())
            .or_default();
        Ok(())
    }

    async fn partition_names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.partitions.read().await.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn delete_partition(&self, partition: &str) -> Result<bool> {
        Ok(self.partitions.write().await.remove(partition).is_some())
    }

    async fn keys(&self, partition: &str) -> Result<Vec<CacheKey>> {
        Ok(self
            .partitions
            .read()
            .await
            .get(partition)
            .map(|entries| entries.iter().map(|(key, _)| key.clone()).collect())
            .unwrap_or_default())
    }

    async fn get(&self, partition: &str, key: &CacheKey) -> Result<Option<HttpResponse>> {
        Ok(self.partitions.read().await.get(partition).and_then(|entries| {
            entries
                .iter()
                .find(|(stored, _)| stored == key)
                .map(|(_, response)| response.clone())
        }))
    }

    async fn put(&self, partition: &str, key: &CacheKey, response: &HttpResponse) -> Result<()> {
        let mut partitions = self.partitions.write().await;
        let entries = partitions.entry(partition.to_string()).or_default();
        entries.retain(|(stored, _)| stored != key);
        entries.push((key.clone(), response.clone()));
        Ok(())
    }

    async fn delete(&self, partition: &str, key: &CacheKey) -> Result<bool> {
        let mut partitions = self.partitions.write().await;
        let Some(entries) = partitions.get_mut(partition) else {
            return Ok(false);
        };
        let before = entries.len();
        entries.retain(|(stored, _)| stored != key);
        Ok(entries.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replace_moves_entry_to_newest() {
        let storage = MemoryCacheStorage::new();
        let a = CacheKey::get("https://example.com/a.mp3");
        let b = CacheKey::get("https://example.com/b.mp3");

        storage.put("p", &a, &HttpResponse::new(200)).await.unwrap();
        storage.put("p", &b, &HttpResponse::new(200)).await.unwrap();
        storage
            .put("p", &a, &HttpResponse::new(200).with_body("new"))
            .await
            .unwrap();

        assert_eq!(storage.keys("p").await.unwrap(), vec![b, a.clone()]);
        assert_eq!(
            storage.get("p", &a).await.unwrap().unwrap().body.as_ref(),
            b"new"
        );
        assert_eq!(storage.len("p").await, 2);
    }

    #[tokio::test]
    async fn test_missing_partition_behaves_empty() {
        let storage = MemoryCacheStorage::new();
        let key = CacheKey::get("https://example.com/x");

        assert!(storage.keys("nope").await.unwrap().is_empty());
        assert!(storage.get("nope", &key).await.unwrap().is_none());
        assert!(!storage.delete("nope", &key).await.unwrap());
        assert!(!storage.delete_partition("nope").await.unwrap());
        assert!(storage.is_empty("nope").await);
    }

    #[tokio::test]
    async fn test_open_and_delete_partition() {
        let storage = MemoryCacheStorage::new();
        storage.open("app-shell-v1").await.unwrap();
        storage.open("data-cache-v1").await.unwrap();

        assert_eq!(
            storage.partition_names().await.unwrap(),
            vec!["app-shell-v1", "data-cache-v1"]
        );
        assert!(storage.delete_partition("app-shell-v1").await.unwrap());
        assert_eq!(storage.partition_names().await.unwrap(), vec!["data-cache-v1"]);
    }
}
