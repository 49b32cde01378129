//! Channel-backed foreground clients

use async_trait::async_trait;
use bridge_traits::{
    client::{ClientConnection, ClientRegistry},
    error::{BridgeError, Result},
};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;
use uuid::Uuid;

/// One connected client; messages land on the receiver handed out by
/// [`ChannelClientRegistry::connect`].
#[derive(Debug)]
pub struct ChannelClient {
    id: String,
    sender: mpsc::UnboundedSender<Value>,
}

#[async_trait]
impl ClientConnection for ChannelClient {
    fn id(&self) -> String {
        self.id.clone()
    }

    async fn post_message(&self, message: Value) -> Result<()> {
        self.sender
            .send(message)
            .map_err(|_| BridgeError::ChannelClosed(self.id.clone()))
    }
}

/// [`ClientRegistry`] whose clients are Tokio unbounded channels.
///
/// Clients whose receiver was dropped are pruned on the next enumeration.
#[derive(Default)]
pub struct ChannelClientRegistry {
    clients: Mutex<Vec<Arc<ChannelClient>>>,
    claimed: AtomicBool,
}

impl ChannelClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new client and return it with its inbox.
    pub async fn connect(&self) -> (Arc<ChannelClient>, mpsc::UnboundedReceiver<Value>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let client = Arc::new(ChannelClient {
            id: Uuid::new_v4().to_string(),
            sender,
        });

        self.clients.lock().await.push(Arc::clone(&client));
        debug!(client = %client.id, "Client connected");

        (client, receiver)
    }

    pub async fn disconnect(&self, id: &str) {
        self.clients.lock().await.retain(|client| client.id != id);
    }

    /// Whether [`ClientRegistry::claim`] has been called.
    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClientRegistry for ChannelClientRegistry {
    async fn connected_clients(&self) -> Result<Vec<Arc<dyn ClientConnection>>> {
        let mut clients = self.clients.lock().await;
        clients.retain(|client| !client.sender.is_closed());

        Ok(clients
            .iter()
            .map(|client| Arc::clone(client) as Arc<dyn ClientConnection>)
            .collect())
    }

    async fn claim(&self) -> Result<()> {
        self.claimed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
