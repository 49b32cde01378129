//! # Diagnostics Reporter
//!
//! Read-only size and count summaries over every partition in storage.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::classifier::RequestClassifier;
use crate::error::Result;
use crate::policy::CacheConfig;
use crate::store::PartitionedStore;

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Human-readable size with 1024-based units and at most two decimals.
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut value = bytes as f64;
    let mut exponent = 0;
    while value >= 1024.0 && exponent < UNITS.len() - 1 {
        value /= 1024.0;
        exponent += 1;
    }

    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[exponent])
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionSummary {
    pub files: usize,
    pub size: u64,
    pub readable_size: String,
    pub audio_files: usize,
    pub audio_size: u64,
    pub audio_readable_size: String,
}

impl PartitionSummary {
    fn add(&mut self, size: u64, audio: bool) {
        self.size += size;
        if audio {
            self.audio_files += 1;
            self.audio_size += size;
        }
    }

    fn absorb(&mut self, other: &PartitionSummary) {
        self.files += other.files;
        self.size += other.size;
        self.audio_files += other.audio_files;
        self.audio_size += other.audio_size;
    }

    fn finish(mut self) -> Self {
        self.readable_size = format_bytes(self.size);
        self.audio_readable_size = format_bytes(self.audio_size);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatusReport {
    pub total: PartitionSummary,
    pub details: BTreeMap<String, PartitionSummary>,
    pub config: CacheConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CacheStatusReport {
    /// Empty report carrying the failure text.
    pub fn failed(config: CacheConfig, error: impl Into<String>) -> Self {
        Self {
            total: PartitionSummary::default().finish(),
            details: BTreeMap::new(),
            config,
            error: Some(error.into()),
        }
    }
}

pub struct DiagnosticsReporter {
    store: PartitionedStore,
    classifier: Arc<RequestClassifier>,
}

impl DiagnosticsReporter {
    pub fn new(store: PartitionedStore, classifier: Arc<RequestClassifier>) -> Self {
        Self { store, classifier }
    }

    /// Walk every partition and entry. Entries that cannot be read are
    /// counted with zero bytes.
    #[instrument(skip(self))]
    pub async fn collect(&self, config: &CacheConfig) -> Result<CacheStatusReport> {
        let mut total = PartitionSummary::default();
        let mut details = BTreeMap::new();

        for name in self.store.partition_names().await? {
            let keys = self.store.keys_by_name(&name).await?;
            let mut summary = PartitionSummary {
                files: keys.len(),
                ..PartitionSummary::default()
            };

            for key in &keys {
                let size = match self.store.get_by_name(&name, key).await {
                    Ok(Some(response)) => response.body.len() as u64,
                    Ok(None) => 0,
                    Err(e) => {
                        warn!(partition = %name, key = %key, error = %e, "Could not size entry");
                        0
                    }
                };
                summary.add(size, self.classifier.is_audio_key(&key.url));
            }

            total.absorb(&summary);
            details.insert(name, summary.finish());
        }

        let total = total.finish();
        debug!(files = total.files, size = total.size, "Collected cache status");

        Ok(CacheStatusReport {
            total,
            details,
            config: *config,
            error: None,
        })
    }
}
