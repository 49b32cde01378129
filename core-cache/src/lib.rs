//! # Core Cache
//!
//! Offline caching proxy that sits between an application's outbound
//! requests and the network.
//!
//! ## Overview
//!
//! Every intercepted request is classified into one category and handed to
//! that category's strategy. Strategies combine network calls, a navigation
//! timeout and reads/writes against two storage partitions:
//!
//! - **shell**: the application shell and visited pages
//! - **data**: runtime data, bounded by count ceilings and evicted oldest first
//!
//! The mutable policy ([`CacheConfig`]) is shared by all requests, persisted
//! through the host's settings store, and synchronized with connected
//! foreground contexts over the message protocol in [`messages`].
//!
//! ## Components
//!
//! - [`classifier`]: request → [`RequestCategory`]
//! - [`store`]: partitioned response store
//! - [`strategy`]: per-category handlers and background revalidation
//! - [`eviction`]: count-bounded eviction with a protected set
//! - [`sync`]: policy slot and durable/foreground synchronization
//! - [`diagnostics`]: size and count summaries
//! - [`controller`]: lifecycle and event entry points
//!
//! All platform access goes through the `bridge-traits` capabilities carried
//! by [`core_runtime::config::ProxyConfig`].

pub mod classifier;
pub mod controller;
pub mod diagnostics;
pub mod error;
pub mod eviction;
pub mod manifest;
pub mod messages;
pub mod policy;
pub mod request;
pub mod store;
pub mod strategy;
pub mod sync;

pub use classifier::{RequestCategory, RequestClassifier};
pub use controller::{ActivationReport, InstallReport, OfflineCacheController, CLEANUP_SYNC_TAG};
pub use diagnostics::{format_bytes, CacheStatusReport, DiagnosticsReporter, PartitionSummary};
pub use error::{CacheError, Result};
pub use eviction::{EntryCounts, EvictionManager, EvictionReport};
pub use manifest::{PageRegistry, ProtectedFileSet};
pub use messages::{InboundMessage, OutboundMessage};
pub use policy::{CacheConfig, CacheConfigPatch};
pub use request::InterceptedRequest;
pub use store::{Partition, PartitionedStore, SkipReason, StoreOutcome};
pub use strategy::{StrategyContext, StrategyDispatcher};
pub use sync::{ConfigChange, ConfigHandle, ConfigSynchronizer};
