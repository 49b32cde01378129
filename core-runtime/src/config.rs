//! # Proxy Configuration Module
//!
//! Static configuration for the offline caching proxy.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `ProxyConfig`
//! instance that holds every bridge the proxy needs plus the static manifests
//! and tunables. It enforces fail-fast validation so a host finds out about a
//! missing capability at construction time rather than on the first request.
//!
//! ## Required Dependencies
//!
//! - `CacheStorage` - Partitioned response storage
//! - `SettingsStore` - Durable record for the cache policy
//! - `ClientRegistry` - Connected foreground contexts
//!
//! ## Optional Dependencies (with platform defaults)
//!
//! - `HttpClient` - Network transport (desktop default: reqwest)
//!
//! When the `desktop-shims` feature is enabled, `ReqwestHttpClient` is
//! injected automatically if no client is provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::ProxyConfig;
//! use std::sync::Arc;
//!
//! let config = ProxyConfig::builder()
//!     .scope("https://example.com/app/")
//!     .http_client(Arc::new(MyHttpClient))
//!     .cache_storage(Arc::new(MyCacheStorage))
//!     .settings_store(Arc::new(MySettingsStore))
//!     .client_registry(Arc::new(MyClientRegistry))
//!     .navigation_timeout(Duration::from_secs(5))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{CacheStorage, ClientRegistry, HttpClient, SettingsStore};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Default navigation network timeout.
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(3);

/// Responses declaring a larger body are not stored as static assets.
pub const DEFAULT_MAX_STATIC_ASSET_BYTES: u64 = 5 * 1024 * 1024;

/// Name of the durable record holding the cache policy.
pub const DEFAULT_CONFIG_RECORD_NAME: &str = "offline-cache-config";

/// Asset paths the proxy must always be able to serve.
///
/// Paths are relative to the proxy scope (`./index.html`, `./js/app.js`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetManifest {
    /// Pre-warmed into the shell partition on install.
    pub app_shell: Vec<String>,
    /// Never evicted, in either partition.
    pub required_files: Vec<String>,
}

impl AssetManifest {
    pub fn new(app_shell: Vec<String>, required_files: Vec<String>) -> Self {
        Self {
            app_shell,
            required_files,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

impl Default for AssetManifest {
    fn default() -> Self {
        let app_shell = [
            "./",
            "./index.html",
            "./test.html",
            "./favicon.svg",
            "./manifest.json",
            "./changelog.txt",
            "./icons/icon-192.png",
            "./icons/icon-512.png",
            "./image/deepseek.png",
            "./image/gemini.png",
            "./image/grok.png",
            "./image/caoxingyu.png",
            "./image/hero.gif",
            "./js/lib/jquery.min.js",
            "./js/lib/jquery.qrcode.min.js",
            "./js/lib/semantic.min.js",
            "./js/lib/semantic.min.css",
            "./js/lib/moment.min.js",
        ];
        let required_files = ["./data.json", "./music.json", "./changelog.txt"];

        Self::new(
            app_shell.iter().map(|p| p.to_string()).collect(),
            required_files.iter().map(|p| p.to_string()).collect(),
        )
    }
}

/// File-name and extension tables used to classify requests.
///
/// File names are compared exactly against the last path segment;
/// extensions are compared case-insensitively and stored without the dot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierRules {
    pub mutable_data_files: Vec<String>,
    pub large_static_files: Vec<String>,
    pub audio_extensions: Vec<String>,
    pub static_extensions: Vec<String>,
}

impl Default for ClassifierRules {
    fn default() -> Self {
        let static_extensions = [
            "png", "jpg", "jpeg", "gif", "svg", "css", "js", "woff", "woff2", "ttf", "eot", "ico",
            "webp", "avif",
        ];

        Self {
            mutable_data_files: vec!["music.json".to_string(), "changelog.txt".to_string()],
            large_static_files: vec!["data.json".to_string()],
            audio_extensions: vec!["mp3".to_string()],
            static_extensions: static_extensions.iter().map(|e| e.to_string()).collect(),
        }
    }
}

/// Names of the two storage partitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionNames {
    pub shell: String,
    pub data: String,
}

impl Default for PartitionNames {
    fn default() -> Self {
        Self {
            shell: "app-shell-v1".to_string(),
            data: "data-cache-v1".to_string(),
        }
    }
}

/// Body served for the large static data file when it is neither cached nor
/// reachable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LargeStaticPlaceholder {
    pub content_type: String,
    pub body: String,
}

impl Default for LargeStaticPlaceholder {
    fn default() -> Self {
        Self {
            content_type: "application/json".to_string(),
            body: "{}".to_string(),
        }
    }
}

/// Static configuration for the offline caching proxy.
///
/// Use [`ProxyConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct ProxyConfig {
    /// Base URL the proxy serves; relative manifest paths resolve against it.
    pub scope: Url,

    pub manifest: AssetManifest,

    pub classifier_rules: ClassifierRules,

    pub partitions: PartitionNames,

    /// Bound on the network leg of a navigation request
    pub navigation_timeout: Duration,

    /// Largest declared `Content-Length` stored as a static asset
    pub max_static_asset_bytes: u64,

    /// Durable record name for the cache policy
    pub config_record_name: String,

    pub large_static_placeholder: LargeStaticPlaceholder,

    /// Network transport (optional with desktop default)
    pub http_client: Arc<dyn HttpClient>,

    /// Partitioned response storage (required)
    pub cache_storage: Arc<dyn CacheStorage>,

    /// Durable policy record storage (required)
    pub settings_store: Arc<dyn SettingsStore>,

    /// Connected foreground contexts (required)
    pub client_registry: Arc<dyn ClientRegistry>,
}

impl std::fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("scope", &self.scope.as_str())
            .field("manifest", &self.manifest)
            .field("classifier_rules", &self.classifier_rules)
            .field("partitions", &self.partitions)
            .field("navigation_timeout", &self.navigation_timeout)
            .field("max_static_asset_bytes", &self.max_static_asset_bytes)
            .field("config_record_name", &self.config_record_name)
            .field("large_static_placeholder", &self.large_static_placeholder)
            .field("http_client", &"HttpClient { ... }")
            .field("cache_storage", &"CacheStorage { ... }")
            .field("settings_store", &"SettingsStore { ... }")
            .field("client_registry", &"ClientRegistry { ... }")
            .finish()
    }
}

impl ProxyConfig {
    /// Creates a new builder for constructing a `ProxyConfig`.
    pub fn builder() -> ProxyConfigBuilder {
        ProxyConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - The scope is an http(s) URL ending in `/`
    /// - Partition names are non-empty and distinct
    /// - Timeouts and size caps are non-zero
    /// - Every manifest path resolves against the scope
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.scope.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "Scope must be an http(s) URL, got scheme '{}'",
                self.scope.scheme()
            )));
        }

        if !self.scope.path().ends_with('/') {
            return Err(Error::Config(format!(
                "Scope path must end with '/', got '{}'",
                self.scope.path()
            )));
        }

        if self.partitions.shell.is_empty() || self.partitions.data.is_empty() {
            return Err(Error::Config("Partition names cannot be empty".to_string()));
        }

        if self.partitions.shell == self.partitions.data {
            return Err(Error::Config(format!(
                "Shell and data partitions must differ, both are '{}'",
                self.partitions.shell
            )));
        }

        if self.navigation_timeout.is_zero() {
            return Err(Error::Config(
                "Navigation timeout must be greater than 0".to_string(),
            ));
        }

        if self.max_static_asset_bytes == 0 {
            return Err(Error::Config(
                "Static asset size cap must be greater than 0 bytes".to_string(),
            ));
        }

        if self.config_record_name.trim().is_empty() {
            return Err(Error::Config(
                "Config record name cannot be empty".to_string(),
            ));
        }

        for path in self
            .manifest
            .app_shell
            .iter()
            .chain(self.manifest.required_files.iter())
        {
            self.resolve(path)?;
        }

        Ok(())
    }

    /// Resolve a scope-relative path to an absolute URL.
    pub fn resolve(&self, path: &str) -> Result<Url> {
        self.scope
            .join(path)
            .map_err(|e| Error::Config(format!("Invalid manifest path '{}': {}", path, e)))
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn http_client_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required to reach the network. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default ReqwestHttpClient. \
                 Web: inject a fetch()-based client."
            .to_string(),
    }
}

fn cache_storage_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "CacheStorage".to_string(),
        message: "CacheStorage implementation is required for the shell and data partitions. \
                 Desktop: inject SqliteCacheStorage (persistent) or MemoryCacheStorage. \
                 Web: inject a Cache Storage API adapter."
            .to_string(),
    }
}

fn settings_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "SettingsStore".to_string(),
        message: "SettingsStore implementation is required to persist the cache policy. \
                 Desktop: inject SqliteSettingsStore. \
                 Web: inject an IndexedDB-backed store."
            .to_string(),
    }
}

fn client_registry_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "ClientRegistry".to_string(),
        message: "ClientRegistry implementation is required to exchange messages with foreground pages. \
                 Desktop: inject ChannelClientRegistry. \
                 Web: wrap self.clients."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(http_client_missing_error())
}

/// Builder for constructing [`ProxyConfig`] instances.
///
/// Unset tunables fall back to their defaults; unset bridges fail the build
/// with [`Error::CapabilityMissing`].
#[derive(Default)]
pub struct ProxyConfigBuilder {
    scope: Option<String>,
    manifest: Option<AssetManifest>,
    classifier_rules: Option<ClassifierRules>,
    partitions: Option<PartitionNames>,
    navigation_timeout: Option<Duration>,
    max_static_asset_bytes: Option<u64>,
    config_record_name: Option<String>,
    large_static_placeholder: Option<LargeStaticPlaceholder>,
    http_client: Option<Arc<dyn HttpClient>>,
    cache_storage: Option<Arc<dyn CacheStorage>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    client_registry: Option<Arc<dyn ClientRegistry>>,
}

impl ProxyConfigBuilder {
    /// Sets the scope URL, e.g. `https://example.com/app/`.
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn manifest(mut self, manifest: AssetManifest) -> Self {
        self.manifest = Some(manifest);
        self
    }

    pub fn classifier_rules(mut self, rules: ClassifierRules) -> Self {
        self.classifier_rules = Some(rules);
        self
    }

    pub fn partitions(mut self, shell: impl Into<String>, data: impl Into<String>) -> Self {
        self.partitions = Some(PartitionNames {
            shell: shell.into(),
            data: data.into(),
        });
        self
    }

    /// Sets the navigation network timeout (default 3 s).
    pub fn navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = Some(timeout);
        self
    }

    /// Sets the static asset size cap (default 5 MiB).
    pub fn max_static_asset_bytes(mut self, bytes: u64) -> Self {
        self.max_static_asset_bytes = Some(bytes);
        self
    }

    pub fn config_record_name(mut self, name: impl Into<String>) -> Self {
        self.config_record_name = Some(name.into());
        self
    }

    pub fn large_static_placeholder(
        mut self,
        content_type: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        self.large_static_placeholder = Some(LargeStaticPlaceholder {
            content_type: content_type.into(),
            body: body.into(),
        });
        self
    }

    /// Sets the HTTP client.
    ///
    /// If not set and `desktop-shims` is enabled, `ReqwestHttpClient` is used.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn cache_storage(mut self, storage: Arc<dyn CacheStorage>) -> Self {
        self.cache_storage = Some(storage);
        self
    }

    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    pub fn client_registry(mut self, registry: Arc<dyn ClientRegistry>) -> Self {
        self.client_registry = Some(registry);
        self
    }

    /// Builds the final `ProxyConfig` instance.
    ///
    /// # Returns
    ///
    /// Returns `Ok(ProxyConfig)` on success, or an error if:
    /// - The scope is missing or not a valid URL
    /// - Required bridges are missing (CacheStorage, SettingsStore, ClientRegistry)
    /// - Configuration values are invalid
    pub fn build(self) -> Result<ProxyConfig> {
        let scope = self.scope.ok_or_else(|| {
            Error::Config("Scope URL is required. Use .scope() to set it.".to_string())
        })?;
        let scope = Url::parse(&scope)
            .map_err(|e| Error::Config(format!("Invalid scope URL '{}': {}", scope, e)))?;

        let cache_storage = self.cache_storage.ok_or_else(cache_storage_missing_error)?;
        let settings_store = self.settings_store.ok_or_else(settings_store_missing_error)?;
        let client_registry = self
            .client_registry
            .ok_or_else(client_registry_missing_error)?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let config = ProxyConfig {
            scope,
            manifest: self.manifest.unwrap_or_default(),
            classifier_rules: self.classifier_rules.unwrap_or_default(),
            partitions: self.partitions.unwrap_or_default(),
            navigation_timeout: self
                .navigation_timeout
                .unwrap_or(DEFAULT_NAVIGATION_TIMEOUT),
            max_static_asset_bytes: self
                .max_static_asset_bytes
                .unwrap_or(DEFAULT_MAX_STATIC_ASSET_BYTES),
            config_record_name: self
                .config_record_name
                .unwrap_or_else(|| DEFAULT_CONFIG_RECORD_NAME.to_string()),
            large_static_placeholder: self.large_static_placeholder.unwrap_or_default(),
            http_client,
            cache_storage,
            settings_store,
            client_registry,
        };

        config.validate()?;

        Ok(config)
    }
}
