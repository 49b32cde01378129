//! # Cache Error Types
//!
//! Error taxonomy for the offline caching proxy.

use bridge_traits::BridgeError;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while intercepting requests or handling messages.
#[derive(Error, Debug)]
pub enum CacheError {
    // ========================================================================
    // Network Errors
    // ========================================================================
    /// The transport failed or the origin answered with a non-OK status.
    #[error("Network request failed: {0}")]
    NetworkFailure(String),

    /// The network did not answer within the configured bound.
    #[error("Network request timed out after {0:?}")]
    TimeoutExceeded(Duration),

    // ========================================================================
    // Storage Errors
    // ========================================================================
    /// No stored response for the given identity.
    #[error("No stored response for {0}")]
    StorageMiss(String),

    /// The storage bridge reported a failure.
    #[error("Storage error: {0}")]
    Storage(#[source] BridgeError),

    // ========================================================================
    // Configuration & Protocol Errors
    // ========================================================================
    /// The durable cache policy could not be read or written.
    #[error("Cache configuration unavailable: {0}")]
    ConfigUnavailable(String),

    /// A foreground payload did not match any known message.
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// A URL could not be parsed or resolved against the scope.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Static configuration was rejected.
    #[error(transparent)]
    Runtime(#[from] core_runtime::Error),
}

impl CacheError {
    /// Returns `true` if this error came from the network leg of a request.
    pub fn is_network_error(&self) -> bool {
        matches!(
            self,
            CacheError::NetworkFailure(_) | CacheError::TimeoutExceeded(_)
        )
    }

    /// Returns `true` if a fallback chain is expected to absorb this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CacheError::NetworkFailure(_)
                | CacheError::TimeoutExceeded(_)
                | CacheError::StorageMiss(_)
                | CacheError::ConfigUnavailable(_)
        )
    }
}

impl From<BridgeError> for CacheError {
    fn from(error: BridgeError) -> Self {
        if error.is_network() {
            CacheError::NetworkFailure(error.to_string())
        } else {
            CacheError::Storage(error)
        }
    }
}

impl From<url::ParseError> for CacheError {
    fn from(error: url::ParseError) -> Self {
        CacheError::InvalidUrl(error.to_string())
    }
}

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_errors_split_by_origin() {
        let network: CacheError = BridgeError::Network("connection refused".into()).into();
        assert!(network.is_network_error());
        assert!(network.is_recoverable());

        let storage: CacheError = BridgeError::Storage("disk full".into()).into();
        assert!(matches!(storage, CacheError::Storage(_)));
        assert!(!storage.is_recoverable());
    }

    #[test]
    fn test_classification_helpers() {
        assert!(CacheError::TimeoutExceeded(Duration::from_secs(3)).is_network_error());
        assert!(!CacheError::StorageMiss("GET /a".into()).is_network_error());
        assert!(CacheError::StorageMiss("GET /a".into()).is_recoverable());
        assert!(!CacheError::InvalidMessage("{}".into()).is_recoverable());
    }

    #[test]
    fn test_display() {
        let err = CacheError::TimeoutExceeded(Duration::from_secs(3));
        assert_eq!(err.to_string(), "Network request timed out after 3s");
    }
}
