//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop hosts
//! (macOS, Windows, Linux) and for tests.
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`
//! - `CacheStorage` using SQLite ([`SqliteCacheStorage`]) or plain memory
//!   ([`MemoryCacheStorage`])
//! - `SettingsStore` using a SQLite-backed key-value table
//! - `ClientRegistry` backed by Tokio channels, one per connected client
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ChannelClientRegistry, ReqwestHttpClient, SqliteCacheStorage};
//!
//! #[tokio::main]
//! async fn main() -> bridge_traits::error::Result<()> {
//!     let http_client = ReqwestHttpClient::new();
//!     let storage = SqliteCacheStorage::new(SqliteCacheStorage::default_path()?).await?;
//!     let clients = ChannelClientRegistry::new();
//!
//!     // Use in proxy configuration
//!     Ok(())
//! }
//! ```

mod cache_storage;
mod clients;
mod http;
mod memory;
mod settings;

pub use cache_storage::SqliteCacheStorage;
pub use clients::{ChannelClient, ChannelClientRegistry};
pub use http::ReqwestHttpClient;
pub use memory::MemoryCacheStorage;
pub use settings::SqliteSettingsStore;
