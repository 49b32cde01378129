//! # Host Bridge Traits
//!
//! Capability traits that every host embedding the offline cache must provide.
//!
//! ## Overview
//!
//! The proxy core never talks to a network stack, a storage engine, or a UI
//! directly. Each of those is a capability the host supplies through one of
//! the traits below, so the same core runs inside a browser worker, a desktop
//! helper process, or a test harness.
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - `fetch(request) -> response | failure`
//!
//! ### Storage
//! - [`CacheStorage`](storage::CacheStorage) - Named partitions of stored responses
//! - [`SettingsStore`](storage::SettingsStore) - Durable key-value records
//!
//! ### Foreground contexts
//! - [`ClientRegistry`](client::ClientRegistry) - Enumerate connected clients
//! - [`ClientConnection`](client::ClientConnection) - Post messages to one client
//!
//! ### Utilities
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! `MemoryCacheStorage` and the other `bridge-desktop` types implement all
//! of these for desktop hosts and tests.
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with descriptive errors when a required capability is
//! missing:
//!
//! ```ignore
//! use core_runtime::config::ProxyConfig;
//!
//! let config = ProxyConfig::builder()
//!     .scope("https://example.com/app/")
//!     .build()?; // Err(CapabilityMissing { capability: "CacheStorage", .. })
//! ```
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert platform errors into it and keep messages actionable.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so a single implementation can be
//! shared by every concurrently handled request.

pub mod client;
pub mod error;
pub mod http;
pub mod logging;
pub mod storage;

pub use error::BridgeError;

pub use client::{ClientConnection, ClientRegistry};
pub use http::{CacheMode, HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use storage::{CacheKey, CacheStorage, SettingsStore};
