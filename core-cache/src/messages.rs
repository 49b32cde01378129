//! Foreground ↔ proxy message protocol.
//!
//! Payloads arrive either as a bare command string (`"cleanup-cache"`) or as
//! an object tagged by `type`. Both forms decode into [`InboundMessage`].

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::diagnostics::CacheStatusReport;
use crate::error::{CacheError, Result};
use crate::policy::{CacheConfig, CacheConfigPatch};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum InboundMessage {
    CleanupCache,
    #[serde(alias = "clear-mp3-cache")]
    ClearAudioCache,
    GetCacheStatus,
    DeleteAllCaches,
    UpdateCacheConfig {
        #[serde(default)]
        config: CacheConfigPatch,
    },
    GetCacheConfig,
    RequestCacheConfig,
    CacheConfigFromPage {
        #[serde(default)]
        config: CacheConfigPatch,
    },
    RegisterPage {
        #[serde(rename = "pagePath")]
        page_path: String,
    },
}

impl InboundMessage {
    pub fn parse(payload: &Value) -> Result<Self> {
        let tagged = match payload {
            Value::String(command) => json!({ "type": command }),
            other => other.clone(),
        };

        serde_json::from_value(tagged)
            .map_err(|e| CacheError::InvalidMessage(format!("{} ({})", e, payload)))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            InboundMessage::CleanupCache => "cleanup-cache",
            InboundMessage::ClearAudioCache => "clear-audio-cache",
            InboundMessage::GetCacheStatus => "get-cache-status",
            InboundMessage::DeleteAllCaches => "delete-all-caches",
            InboundMessage::UpdateCacheConfig { .. } => "update-cache-config",
            InboundMessage::GetCacheConfig => "get-cache-config",
            InboundMessage::RequestCacheConfig => "request-cache-config",
            InboundMessage::CacheConfigFromPage { .. } => "cache-config-from-page",
            InboundMessage::RegisterPage { .. } => "register-page",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OutboundMessage {
    CacheStatus {
        status: CacheStatusReport,
        config: CacheConfig,
    },
    AllCachesDeleted,
    CacheConfigUpdated {
        config: CacheConfig,
    },
    CacheConfigResponse {
        config: CacheConfig,
    },
    /// Sent by the proxy to pull the policy from foreground contexts.
    RequestCacheConfig,
}

impl OutboundMessage {
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_and_tagged_forms_are_equivalent() {
        for command in ["cleanup-cache", "get-cache-status", "delete-all-caches"] {
            let bare = InboundMessage::parse(&json!(command)).unwrap();
            let tagged = InboundMessage::parse(&json!({ "type": command })).unwrap();
            assert_eq!(bare, tagged);
            assert_eq!(bare.kind(), command);
        }
    }

    #[test]
    fn test_legacy_audio_alias() {
        assert_eq!(
            InboundMessage::parse(&json!("clear-mp3-cache")).unwrap(),
            InboundMessage::ClearAudioCache
        );
        assert_eq!(
            InboundMessage::parse(&json!({"type": "clear-audio-cache"})).unwrap(),
            InboundMessage::ClearAudioCache
        );
    }

    #[test]
    fn test_config_payloads() {
        let message = InboundMessage::parse(&json!({
            "type": "update-cache-config",
            "config": {"enableMp3Cache": false, "maxOtherCacheCount": 5}
        }))
        .unwrap();

        assert_eq!(
            message,
            InboundMessage::UpdateCacheConfig {
                config: CacheConfigPatch::default()
                    .enable_audio_cache(false)
                    .max_other_cache_count(5)
            }
        );

        let empty = InboundMessage::parse(&json!({"type": "cache-config-from-page"})).unwrap();
        assert_eq!(
            empty,
            InboundMessage::CacheConfigFromPage {
                config: CacheConfigPatch::default()
            }
        );
    }

    #[test]
    fn test_register_page() {
        let message =
            InboundMessage::parse(&json!({"type": "register-page", "pagePath": "./about.html"})).unwrap();
        assert_eq!(
            message,
            InboundMessage::RegisterPage {
                page_path: "./about.html".into()
            }
        );
        assert!(InboundMessage::parse(&json!({"type": "register-page"})).is_err());
    }

    #[test]
    fn test_unknown_payloads_rejected() {
        for payload in [json!("reboot"), json!({"kind": "cleanup-cache"}), json!(42), json!(null)] {
            assert!(matches!(
                InboundMessage::parse(&payload),
                Err(CacheError::InvalidMessage(_))
            ));
        }
    }

    #[test]
    fn test_outbound_shapes() {
        let config = CacheConfig::default();

        assert_eq!(
            OutboundMessage::CacheConfigUpdated { config }.to_value(),
            json!({
                "type": "cache-config-updated",
                "config": {"enableAudioCache": true, "maxAudioCacheCount": 30, "maxOtherCacheCount": 50}
            })
        );
        assert_eq!(
            OutboundMessage::AllCachesDeleted.to_value(),
            json!({"type": "all-caches-deleted"})
        );
        assert_eq!(
            OutboundMessage::RequestCacheConfig.to_value(),
            json!({"type": "request-cache-config"})
        );
    }
}
