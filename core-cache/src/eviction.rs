//! # Eviction Manager
//!
//! Count-bounded, oldest-first eviction over the data partition. Entries in
//! the [`ProtectedFileSet`] are never deleted, whatever the ceilings say.

use bridge_traits::CacheKey;
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::classifier::RequestClassifier;
use crate::error::Result;
use crate::manifest::ProtectedFileSet;
use crate::policy::CacheConfig;
use crate::store::{Partition, PartitionedStore};

/// Data-partition entry counts split by eviction class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryCounts {
    pub protected: usize,
    pub audio: usize,
    pub other: usize,
}

impl EntryCounts {
    pub fn total(&self) -> usize {
        self.protected + self.audio + self.other
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvictionReport {
    pub before: EntryCounts,
    pub after: EntryCounts,
    pub deleted: usize,
    pub failures: usize,
}

/// Data partition keys grouped by class, each list oldest first.
#[derive(Debug, Default)]
struct Census {
    protected: Vec<CacheKey>,
    audio: Vec<CacheKey>,
    other: Vec<CacheKey>,
}

impl Census {
    fn counts(&self) -> EntryCounts {
        EntryCounts {
            protected: self.protected.len(),
            audio: self.audio.len(),
            other: self.other.len(),
        }
    }
}

pub struct EvictionManager {
    store: PartitionedStore,
    classifier: Arc<RequestClassifier>,
    protected: Arc<ProtectedFileSet>,
}

impl EvictionManager {
    pub fn new(
        store: PartitionedStore,
        classifier: Arc<RequestClassifier>,
        protected: Arc<ProtectedFileSet>,
    ) -> Self {
        Self {
            store,
            classifier,
            protected,
        }
    }

    async fn census(&self) -> Result<Census> {
        let mut census = Census::default();
        for key in self.store.keys(Partition::Data).await? {
            if self.protected.contains_key(&key) {
                census.protected.push(key);
            } else if self.classifier.is_audio_key(&key.url) {
                census.audio.push(key);
            } else {
                census.other.push(key);
            }
        }
        Ok(census)
    }

    pub async fn counts(&self) -> Result<EntryCounts> {
        Ok(self.census().await?.counts())
    }

    /// Non-protected audio entries in the data partition.
    pub async fn audio_count(&self) -> Result<usize> {
        Ok(self.census().await?.audio.len())
    }

    /// Non-protected, non-audio entries in the data partition.
    pub async fn other_count(&self) -> Result<usize> {
        Ok(self.census().await?.other.len())
    }

    /// Bring both classes within their ceilings.
    pub async fn run_pass(&self, config: &CacheConfig) -> Result<EvictionReport> {
        self.run_pass_with_headroom(config, 0).await
    }

    /// Like [`run_pass`](Self::run_pass) but leaves room for `headroom` more
    /// audio entries.
    #[instrument(skip(self))]
    pub async fn run_pass_with_headroom(
        &self,
        config: &CacheConfig,
        headroom: usize,
    ) -> Result<EvictionReport> {
        let census = self.census().await?;
        let before = census.counts();
        info!(
            protected = before.protected,
            audio = before.audio,
            other = before.other,
            "Eviction pass started"
        );

        let mut victims = Vec::new();

        if config.enable_audio_cache {
            let limit = (config.max_audio_cache_count as usize).saturating_sub(headroom);
            victims.extend_from_slice(oldest_excess(&census.audio, limit));
        }
        victims.extend_from_slice(oldest_excess(
            &census.other,
            config.max_other_cache_count as usize,
        ));

        let (deleted, failures) = self.delete_all(&victims).await;
        let after = self.counts().await.unwrap_or(before);

        info!(
            deleted,
            failures,
            audio = after.audio,
            other = after.other,
            "Eviction pass finished"
        );

        Ok(EvictionReport {
            before,
            after,
            deleted,
            failures,
        })
    }

    /// Delete every non-protected audio entry regardless of ceilings.
    #[instrument(skip(self))]
    pub async fn clear_audio(&self) -> Result<EvictionReport> {
        let census = self.census().await?;
        let before = census.counts();

        let (deleted, failures) = self.delete_all(&census.audio).await;
        info!(deleted, failures, "Cleared audio cache");

        Ok(EvictionReport {
            before,
            after: EntryCounts {
                audio: before.audio - deleted,
                ..before
            },
            deleted,
            failures,
        })
    }

    /// Concurrent deletes; returns (deleted, failed).
    async fn delete_all(&self, keys: &[CacheKey]) -> (usize, usize) {
        if keys.is_empty() {
            return (0, 0);
        }

        let results = join_all(keys.iter().map(|key| self.store.delete(Partition::Data, key))).await;

        let mut deleted = 0;
        let mut failures = 0;
        for (key, result) in keys.iter().zip(results) {
            match result {
                Ok(true) => {
                    debug!(key = %key, "Evicted entry");
                    deleted += 1;
                }
                // Already gone, e.g. a concurrent pass got there first
                Ok(false) => {}
                Err(e) => {
                    warn!(key = %key, error = %e, "Failed to evict entry");
                    failures += 1;
                }
            }
        }
        (deleted, failures)
    }
}

fn oldest_excess(keys: &[CacheKey], limit: usize) -> &[CacheKey] {
    &keys[..keys.len().saturating_sub(limit)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_desktop::MemoryCacheStorage;
    use bridge_traits::HttpResponse;
    use core_runtime::config::{AssetManifest, PartitionNames};
    use url::Url;

    struct Fixture {
        store: PartitionedStore,
        manager: EvictionManager,
    }

    fn fixture() -> Fixture {
        let scope = Url::parse("https://example.com/app/").unwrap();
        let manifest = AssetManifest::new(
            vec![],
            vec!["./music.json".into(), "./protected.mp3".into()],
        );
        let store = PartitionedStore::new(Arc::new(MemoryCacheStorage::new()), PartitionNames::default());
        let manager = EvictionManager::new(
            store.clone(),
            Arc::new(RequestClassifier::default()),
            Arc::new(ProtectedFileSet::from_manifest(&scope, &manifest).unwrap()),
        );
        Fixture { store, manager }
    }

    async fn fill(store: &PartitionedStore, names: impl IntoIterator<Item = String>) {
        for name in names {
            let key = CacheKey::get(format!("https://example.com/app/{}", name));
            store
                .put(Partition::Data, &key, &HttpResponse::new(200).with_body(name))
                .await
                .unwrap();
        }
    }

    fn config(audio: u32, other: u32) -> CacheConfig {
        CacheConfig {
            enable_audio_cache: true,
            max_audio_cache_count: audio,
            max_other_cache_count: other,
        }
    }

    #[tokio::test]
    async fn test_census_splits_classes() {
        let f = fixture();
        fill(
            &f.store,
            ["music.json", "protected.mp3", "a.mp3", "b.mp3", "api"].map(String::from),
        )
        .await;

        let counts = f.manager.counts().await.unwrap();
        assert_eq!(
            counts,
            EntryCounts {
                protected: 2,
                audio: 2,
                other: 1
            }
        );
        assert_eq!(counts.total(), 5);
    }

    #[tokio::test]
    async fn test_pass_deletes_oldest_excess() {
        let f = fixture();
        fill(&f.store, (0..5).map(|i| format!("{}.mp3", i))).await;
        fill(&f.store, (0..4).map(|i| format!("item-{}", i))).await;

        let report = f.manager.run_pass(&config(3, 2)).await.unwrap();

        assert_eq!(report.deleted, 4);
        assert_eq!(report.after.audio, 3);
        assert_eq!(report.after.other, 2);

        let keys: Vec<String> = f
            .store
            .keys(Partition::Data)
            .await
            .unwrap()
            .into_iter()
            .map(|k| k.url)
            .collect();
        assert!(!keys.contains(&"https://example.com/app/0.mp3".to_string()));
        assert!(!keys.contains(&"https://example.com/app/1.mp3".to_string()));
        assert!(keys.contains(&"https://example.com/app/4.mp3".to_string()));
        assert!(!keys.contains(&"https://example.com/app/item-0".to_string()));
        assert!(keys.contains(&"https://example.com/app/item-3".to_string()));
    }

    #[tokio::test]
    async fn test_protected_survive_zero_ceilings() {
        let f = fixture();
        fill(
            &f.store,
            ["music.json", "protected.mp3", "a.mp3", "other"].map(String::from),
        )
        .await;

        let report = f.manager.run_pass(&config(0, 0)).await.unwrap();

        assert_eq!(report.deleted, 2);
        assert_eq!(
            report.after,
            EntryCounts {
                protected: 2,
                audio: 0,
                other: 0
            }
        );
        assert_eq!(f.store.keys(Partition::Data).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_audio_untouched_when_disabled() {
        let f = fixture();
        fill(&f.store, (0..4).map(|i| format!("{}.mp3", i))).await;

        let disabled = CacheConfig {
            enable_audio_cache: false,
            ..config(1, 50)
        };
        let report = f.manager.run_pass(&disabled).await.unwrap();

        assert_eq!(report.deleted, 0);
        assert_eq!(report.after.audio, 4);
    }

    #[tokio::test]
    async fn test_headroom_makes_room_for_one() {
        let f = fixture();
        fill(&f.store, (0..3).map(|i| format!("{}.mp3", i))).await;

        let report = f
            .manager
            .run_pass_with_headroom(&config(3, 50), 1)
            .await
            .unwrap();

        assert_eq!(report.deleted, 1);
        assert_eq!(f.manager.audio_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_clear_audio_ignores_ceilings() {
        let f = fixture();
        fill(
            &f.store,
            ["protected.mp3", "a.mp3", "b.mp3", "x"].map(String::from),
        )
        .await;

        let report = f.manager.clear_audio().await.unwrap();

        assert_eq!(report.deleted, 2);
        assert_eq!(f.manager.audio_count().await.unwrap(), 0);
        assert_eq!(f.manager.other_count().await.unwrap(), 1);
        assert_eq!(f.manager.counts().await.unwrap().protected, 1);
    }
}
