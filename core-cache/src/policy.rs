//! Mutable cache policy

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_AUDIO_CACHE_COUNT: u32 = 30;
pub const DEFAULT_MAX_OTHER_CACHE_COUNT: u32 = 50;

/// Runtime cache policy, always fully populated.
///
/// Serialized camelCase. The older `enableMp3Cache` / `maxMp3CacheCount`
/// field names are accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfig {
    #[serde(alias = "enableMp3Cache")]
    pub enable_audio_cache: bool,
    #[serde(alias = "maxMp3CacheCount")]
    pub max_audio_cache_count: u32,
    pub max_other_cache_count: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enable_audio_cache: true,
            max_audio_cache_count: DEFAULT_MAX_AUDIO_CACHE_COUNT,
            max_other_cache_count: DEFAULT_MAX_OTHER_CACHE_COUNT,
        }
    }
}

impl CacheConfig {
    /// Overlay the fields present in `patch`.
    pub fn merge(&self, patch: &CacheConfigPatch) -> CacheConfig {
        CacheConfig {
            enable_audio_cache: patch.enable_audio_cache.unwrap_or(self.enable_audio_cache),
            max_audio_cache_count: patch
                .max_audio_cache_count
                .unwrap_or(self.max_audio_cache_count),
            max_other_cache_count: patch
                .max_other_cache_count
                .unwrap_or(self.max_other_cache_count),
        }
    }

    /// Overlay `patch` on the defaults.
    pub fn from_defaults(patch: &CacheConfigPatch) -> CacheConfig {
        CacheConfig::default().merge(patch)
    }

    /// Audio responses are read from and written to storage.
    pub fn audio_caching_active(&self) -> bool {
        self.enable_audio_cache && self.max_audio_cache_count > 0
    }

    /// Whether moving from `self` to `next` must be followed by an eviction
    /// pass: the audio policy changed or the other-ceiling was lowered.
    pub fn requires_eviction(&self, next: &CacheConfig) -> bool {
        self.enable_audio_cache != next.enable_audio_cache
            || self.max_audio_cache_count != next.max_audio_cache_count
            || next.max_other_cache_count < self.max_other_cache_count
    }
}

/// Partial policy as sent by a foreground page; absent fields keep their
/// current (or default) value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfigPatch {
    #[serde(default, alias = "enableMp3Cache", skip_serializing_if = "Option::is_none")]
    pub enable_audio_cache: Option<bool>,
    #[serde(default, alias = "maxMp3CacheCount", skip_serializing_if = "Option::is_none")]
    pub max_audio_cache_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_other_cache_count: Option<u32>,
}

impl CacheConfigPatch {
    pub fn enable_audio_cache(mut self, enabled: bool) -> Self {
        self.enable_audio_cache = Some(enabled);
        self
    }

    pub fn max_audio_cache_count(mut self, count: u32) -> Self {
        self.max_audio_cache_count = Some(count);
        self
    }

    pub fn max_other_cache_count(mut self, count: u32) -> Self {
        self.max_other_cache_count = Some(count);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == CacheConfigPatch::default()
    }
}

impl From<CacheConfig> for CacheConfigPatch {
    fn from(config: CacheConfig) -> Self {
        Self {
            enable_audio_cache: Some(config.enable_audio_cache),
            max_audio_cache_count: Some(config.max_audio_cache_count),
            max_other_cache_count: Some(config.max_other_cache_count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = CacheConfig::default();
        assert!(config.enable_audio_cache);
        assert_eq!(config.max_audio_cache_count, 30);
        assert_eq!(config.max_other_cache_count, 50);
        assert!(config.audio_caching_active());
    }

    #[test]
    fn test_merge_is_idempotent() {
        let base = CacheConfig::default();
        let patch = CacheConfigPatch::default()
            .enable_audio_cache(false)
            .max_other_cache_count(10);

        let once = base.merge(&patch);
        let twice = once.merge(&patch);

        assert_eq!(once, twice);
        assert!(!once.enable_audio_cache);
        assert_eq!(once.max_audio_cache_count, 30);
        assert_eq!(once.max_other_cache_count, 10);
    }

    #[test]
    fn test_from_defaults_ignores_current() {
        let patch = CacheConfigPatch::default().max_audio_cache_count(5);
        let config = CacheConfig::from_defaults(&patch);
        assert_eq!(
            config,
            CacheConfig {
                enable_audio_cache: true,
                max_audio_cache_count: 5,
                max_other_cache_count: 50,
            }
        );
    }

    #[test]
    fn test_serde_camel_case_and_legacy_aliases() {
        let config = CacheConfig::default();
        let value = serde_json::to_value(config).unwrap();
        assert_eq!(
            value,
            json!({"enableAudioCache": true, "maxAudioCacheCount": 30, "maxOtherCacheCount": 50})
        );

        let legacy: CacheConfigPatch =
            serde_json::from_value(json!({"enableMp3Cache": false, "maxMp3CacheCount": 3})).unwrap();
        assert_eq!(legacy.enable_audio_cache, Some(false));
        assert_eq!(legacy.max_audio_cache_count, Some(3));
        assert_eq!(legacy.max_other_cache_count, None);

        let full: CacheConfig = serde_json::from_value(
            json!({"enableMp3Cache": true, "maxMp3CacheCount": 7, "maxOtherCacheCount": 8}),
        )
        .unwrap();
        assert_eq!(full.max_audio_cache_count, 7);
    }

    #[test]
    fn test_negative_counts_rejected() {
        let parsed = serde_json::from_value::<CacheConfigPatch>(json!({"maxOtherCacheCount": -1}));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_eviction_trigger() {
        let base = CacheConfig::default();

        assert!(!base.requires_eviction(&base));
        assert!(base.requires_eviction(&CacheConfig {
            enable_audio_cache: false,
            ..base
        }));
        assert!(base.requires_eviction(&CacheConfig {
            max_audio_cache_count: 31,
            ..base
        }));
        assert!(base.requires_eviction(&CacheConfig {
            max_other_cache_count: 49,
            ..base
        }));
        assert!(!base.requires_eviction(&CacheConfig {
            max_other_cache_count: 80,
            ..base
        }));
    }

    #[test]
    fn test_audio_ceiling_zero_disables_audio_caching() {
        let config = CacheConfig {
            max_audio_cache_count: 0,
            ..CacheConfig::default()
        };
        assert!(!config.audio_caching_active());
    }

    #[test]
    fn test_patch_round_trip() {
        let patch = CacheConfigPatch::from(CacheConfig::default());
        assert!(!patch.is_empty());
        assert_eq!(CacheConfig::from_defaults(&patch), CacheConfig::default());
        assert!(CacheConfigPatch::default().is_empty());
    }
}
