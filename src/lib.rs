//! Workspace façade crate.
//!
//! Re-exports the proxy core together with the bridge traits and runtime
//! configuration so hosts can depend on `offline-cache-workspace` alone. The
//! default `desktop-shims` feature also pulls in the desktop bridge
//! implementations (reqwest, SQLite, tokio channels).

pub use bridge_traits;
pub use core_cache;
pub use core_runtime;

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop;

pub use core_cache::{
    CacheConfig, CacheConfigPatch, CacheError, InterceptedRequest, OfflineCacheController,
};
pub use core_runtime::config::ProxyConfig;
pub use core_runtime::logging::{init_logging, LoggingConfig};
