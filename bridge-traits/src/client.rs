//! Foreground Client Abstractions
//!
//! The proxy runs in a background context (service worker, helper process,
//! embedded runtime). Foreground contexts that want to talk to it are exposed
//! as [`ClientConnection`]s, discovered through a [`ClientRegistry`].
//!
//! Connections are ephemeral: they are never persisted, carry no ordering
//! guarantees, and may disappear between two calls.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::error::Result;

/// Handle to one connected foreground context.
#[async_trait]
pub trait ClientConnection: Send + Sync {
    /// Stable identifier for logging.
    fn id(&self) -> String;

    /// Deliver a JSON message to the client.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::ChannelClosed`](crate::BridgeError::ChannelClosed)
    /// if the client went away.
    async fn post_message(&self, message: Value) -> Result<()>;
}

/// Enumerates the currently connected foreground contexts.
#[async_trait]
pub trait ClientRegistry: Send + Sync {
    /// Every client connected right now.
    async fn connected_clients(&self) -> Result<Vec<Arc<dyn ClientConnection>>>;

    /// Take control of clients that were loaded before this worker activated.
    async fn claim(&self) -> Result<()> {
        Ok(())
    }
}
