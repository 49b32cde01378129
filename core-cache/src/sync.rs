//! # Configuration Synchronizer
//!
//! Owns the single in-memory [`CacheConfig`] slot and keeps it in step with
//! the durable settings record and with connected foreground contexts.
//!
//! Precedence is defaults < durable record < foreground message. Every write
//! bumps a revision counter; the durable value read at startup is applied
//! only if no foreground write landed while it was being read.

use bridge_traits::{ClientRegistry, SettingsStore};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::error::{CacheError, Result};
use crate::messages::OutboundMessage;
use crate::policy::{CacheConfig, CacheConfigPatch};

#[derive(Debug, Default)]
struct ConfigSlot {
    config: CacheConfig,
    revision: u64,
}

/// Shared, cloneable handle to the process-wide cache policy.
#[derive(Debug, Clone, Default)]
pub struct ConfigHandle {
    inner: Arc<RwLock<ConfigSlot>>,
}

impl ConfigHandle {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ConfigSlot {
                config,
                revision: 0,
            })),
        }
    }

    /// Copy of the current policy; handlers work on one snapshot per request.
    pub async fn snapshot(&self) -> CacheConfig {
        self.inner.read().await.config
    }

    pub async fn revision(&self) -> u64 {
        self.inner.read().await.revision
    }

    /// Replace the policy, returning the previous one.
    pub async fn replace(&self, config: CacheConfig) -> CacheConfig {
        let mut slot = self.inner.write().await;
        let previous = std::mem::replace(&mut slot.config, config);
        slot.revision += 1;
        previous
    }

    /// Apply `update` to the current policy atomically.
    pub async fn update<F>(&self, update: F) -> ConfigChange
    where
        F: FnOnce(&CacheConfig) -> CacheConfig,
    {
        let mut slot = self.inner.write().await;
        let previous = slot.config;
        slot.config = update(&previous);
        slot.revision += 1;
        ConfigChange {
            previous,
            current: slot.config,
        }
    }

    /// Install `config` only if nothing was written since `revision`.
    pub async fn seed_if_unchanged(&self, revision: u64, config: CacheConfig) -> bool {
        let mut slot = self.inner.write().await;
        if slot.revision != revision {
            return false;
        }
        slot.config = config;
        slot.revision += 1;
        true
    }
}

/// Before/after pair produced by every policy write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigChange {
    pub previous: CacheConfig,
    pub current: CacheConfig,
}

impl ConfigChange {
    pub fn requires_eviction(&self) -> bool {
        self.previous.requires_eviction(&self.current)
    }
}

pub struct ConfigSynchronizer {
    handle: ConfigHandle,
    settings: Arc<dyn SettingsStore>,
    clients: Arc<dyn ClientRegistry>,
    record_name: String,
    /// Held across slot update and persistence so the durable record is
    /// written in the same order as the in-memory slot.
    writes: Mutex<()>,
}

impl ConfigSynchronizer {
    pub fn new(
        handle: ConfigHandle,
        settings: Arc<dyn SettingsStore>,
        clients: Arc<dyn ClientRegistry>,
        record_name: impl Into<String>,
    ) -> Self {
        Self {
            handle,
            settings,
            clients,
            record_name: record_name.into(),
            writes: Mutex::new(()),
        }
    }

    pub fn handle(&self) -> &ConfigHandle {
        &self.handle
    }

    /// Read the durable record. `Ok(None)` when nothing was ever persisted.
    pub async fn load_durable(&self) -> Result<Option<CacheConfig>> {
        let raw = self
            .settings
            .get_string(&self.record_name)
            .await
            .map_err(|e| CacheError::ConfigUnavailable(e.to_string()))?;

        let Some(raw) = raw else {
            return Ok(None);
        };

        let patch: CacheConfigPatch = serde_json::from_str(&raw)
            .map_err(|e| CacheError::ConfigUnavailable(format!("Corrupt config record: {}", e)))?;
        Ok(Some(CacheConfig::from_defaults(&patch)))
    }

    /// Ask every connected foreground context to push its policy. Returns the
    /// number of contexts reached.
    pub async fn request_from_clients(&self) -> usize {
        let clients = match self.clients.connected_clients().await {
            Ok(clients) => clients,
            Err(e) => {
                warn!(error = %e, "Could not enumerate clients");
                return 0;
            }
        };

        let message = OutboundMessage::RequestCacheConfig.to_value();
        let results = join_all(
            clients
                .iter()
                .map(|client| client.post_message(message.clone())),
        )
        .await;

        results
            .into_iter()
            .zip(&clients)
            .filter(|(result, client)| match result {
                Ok(()) => true,
                Err(e) => {
                    debug!(client = %client.id(), error = %e, "Config request not delivered");
                    false
                }
            })
            .count()
    }

    /// Seed the slot: durable read and foreground broadcast run concurrently.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> CacheConfig {
        let revision = self.handle.revision().await;

        let (durable, reached) = tokio::join!(self.load_durable(), self.request_from_clients());
        debug!(clients = reached, "Requested cache config from clients");

        match durable {
            Ok(Some(config)) => {
                if self.handle.seed_if_unchanged(revision, config).await {
                    info!(?config, "Loaded cache config from durable store");
                } else {
                    debug!("Durable config superseded by a foreground update");
                }
            }
            Ok(None) => debug!("No durable cache config, keeping defaults"),
            Err(e) => warn!(error = %e, "Falling back to default cache config"),
        }

        self.handle.snapshot().await
    }

    /// `update-cache-config`: merge over the current policy, then persist.
    #[instrument(skip(self))]
    pub async fn apply_update(&self, patch: &CacheConfigPatch) -> ConfigChange {
        let change = self.commit(|current| current.merge(patch)).await;
        info!(config = ?change.current, "Cache config updated");
        change
    }

    /// `cache-config-from-page`: merge over the defaults, then persist.
    #[instrument(skip(self))]
    pub async fn apply_from_page(&self, patch: &CacheConfigPatch) -> ConfigChange {
        let change = self.commit(|_| CacheConfig::from_defaults(patch)).await;
        info!(config = ?change.current, "Cache config received from page");
        change
    }

    async fn commit<F>(&self, update: F) -> ConfigChange
    where
        F: FnOnce(&CacheConfig) -> CacheConfig,
    {
        let _writes = self.writes.lock().await;
        let change = self.handle.update(update).await;
        self.persist(&change.current).await;
        change
    }

    /// Write `config` to the durable record. Failures are logged only.
    pub async fn persist(&self, config: &CacheConfig) -> bool {
        let result = match serde_json::to_string(config) {
            Ok(json) => self
                .settings
                .set_string(&self.record_name, &json)
                .await
                .map_err(|e| CacheError::ConfigUnavailable(e.to_string())),
            Err(e) => Err(CacheError::from(e)),
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Failed to persist cache config");
                false
            }
        }
    }
}
