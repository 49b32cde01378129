//! # Offline Cache Controller
//!
//! Single entry point for the host. Every lifecycle event, intercepted
//! request, foreground message and maintenance signal enters through one
//! named method here. The controller owns no threads; the host drives it.
//!
//! ```ignore
//! let controller = OfflineCacheController::new(proxy_config)?;
//! controller.install().await?;
//! controller.activate().await?;
//!
//! if let Some(response) = controller.handle_fetch(request).await? {
//!     // serve `response`
//! }
//! ```

use bridge_traits::{CacheKey, CacheMode, ClientConnection, ClientRegistry, HttpClient, HttpResponse};
use core_runtime::config::{AssetManifest, ProxyConfig};
use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::classifier::RequestClassifier;
use crate::diagnostics::{CacheStatusReport, DiagnosticsReporter};
use crate::error::{CacheError, Result};
use crate::eviction::{EvictionManager, EvictionReport};
use crate::manifest::{PageRegistry, ProtectedFileSet};
use crate::messages::{InboundMessage, OutboundMessage};
use crate::policy::CacheConfig;
use crate::request::{navigation_key, InterceptedRequest};
use crate::store::{Partition, PartitionedStore};
use crate::strategy::{BackgroundRevalidator, StrategyContext, StrategyDispatcher};
use crate::sync::{ConfigChange, ConfigHandle, ConfigSynchronizer};

/// Maintenance tag that triggers an eviction pass.
pub const CLEANUP_SYNC_TAG: &str = "cleanup-cache";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallReport {
    pub cached: Vec<String>,
    pub failed: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationReport {
    pub deleted_partitions: Vec<String>,
    pub claimed: bool,
    pub config: CacheConfig,
    pub eviction: Option<EvictionReport>,
}

pub struct OfflineCacheController {
    scope: Url,
    manifest: AssetManifest,
    http: Arc<dyn HttpClient>,
    clients: Arc<dyn ClientRegistry>,
    classifier: Arc<RequestClassifier>,
    store: PartitionedStore,
    eviction: Arc<EvictionManager>,
    sync: ConfigSynchronizer,
    dispatcher: StrategyDispatcher,
    diagnostics: DiagnosticsReporter,
    pages: PageRegistry,
}

impl OfflineCacheController {
    /// Wire every component from a validated [`ProxyConfig`].
    pub fn new(config: ProxyConfig) -> Result<Self> {
        config.validate()?;

        let classifier = Arc::new(RequestClassifier::new(&config.classifier_rules));
        let protected = Arc::new(ProtectedFileSet::from_manifest(&config.scope, &config.manifest)?);
        let store = PartitionedStore::new(config.cache_storage.clone(), config.partitions.clone());
        let eviction = Arc::new(EvictionManager::new(
            store.clone(),
            Arc::clone(&classifier),
            protected,
        ));

        let sync = ConfigSynchronizer::new(
            ConfigHandle::default(),
            config.settings_store.clone(),
            config.client_registry.clone(),
            config.config_record_name.clone(),
        );

        let dispatcher = StrategyDispatcher::new(StrategyContext {
            http: config.http_client.clone(),
            store: store.clone(),
            classifier: Arc::clone(&classifier),
            eviction: Arc::clone(&eviction),
            revalidator: BackgroundRevalidator::new(config.http_client.clone(), store.clone()),
            scope: config.scope.clone(),
            navigation_timeout: config.navigation_timeout,
            max_static_asset_bytes: config.max_static_asset_bytes,
            large_static_placeholder: config.large_static_placeholder.clone(),
        });

        let diagnostics = DiagnosticsReporter::new(store.clone(), Arc::clone(&classifier));
        let pages = PageRegistry::from_manifest(&config.manifest);

        info!(scope = %config.scope, "Offline cache controller created");

        Ok(Self {
            scope: config.scope,
            manifest: config.manifest,
            http: config.http_client,
            clients: config.client_registry,
            classifier,
            store,
            eviction,
            sync,
            dispatcher,
            diagnostics,
            pages,
        })
    }

    pub fn config_handle(&self) -> &ConfigHandle {
        self.sync.handle()
    }

    pub async fn current_config(&self) -> CacheConfig {
        self.sync.handle().snapshot().await
    }

    /// Cold start without install: open partitions and seed the policy.
    #[instrument(skip(self))]
    pub async fn startup(&self) -> Result<CacheConfig> {
        self.store.open_all().await?;
        Ok(self.sync.initialize().await)
    }

    /// Pre-warm the app shell and seed the policy, concurrently. One failing
    /// asset never blocks the others.
    #[instrument(skip(self))]
    pub async fn install(&self) -> Result<InstallReport> {
        self.store.open_all().await?;

        let (report, config) = tokio::join!(self.prewarm_shell(), self.sync.initialize());

        info!(
            cached = report.cached.len(),
            failed = report.failed.len(),
            ?config,
            "Install finished"
        );
        Ok(report)
    }

    async fn prewarm_shell(&self) -> InstallReport {
        let results = join_all(self.manifest.app_shell.iter().map(|path| async move {
            let outcome = match self.scope.join(path) {
                Ok(url) => {
                    let key = CacheKey::get(url.as_str());
                    self.prewarm(&url, &key).await
                }
                Err(e) => Err(CacheError::from(e)),
            };
            (path.clone(), outcome)
        }))
        .await;

        let mut report = InstallReport::default();
        for (path, outcome) in results {
            match outcome {
                Ok(()) => report.cached.push(path),
                Err(e) => {
                    warn!(path = %path, error = %e, "Failed to pre-warm shell asset");
                    report.failed.push(path);
                }
            }
        }
        report
    }

    /// Fetch `url` and store it into the shell partition under `key`.
    async fn prewarm(&self, url: &Url, key: &CacheKey) -> Result<()> {
        let request = InterceptedRequest::new(key.method, url.clone());
        let response = self
            .http
            .execute(request.to_http_request(CacheMode::Default))
            .await?;

        if !response.is_success() {
            return Err(CacheError::NetworkFailure(format!(
                "{} answered {}",
                url, response.status
            )));
        }
        self.store.put(Partition::Shell, key, &response).await
    }

    /// Drop stale partitions, take control of open clients, refresh the
    /// policy, then run an eviction pass.
    #[instrument(skip(self))]
    pub async fn activate(&self) -> Result<ActivationReport> {
        let deleted_partitions = self.store.delete_unrecognized().await?;
        if !deleted_partitions.is_empty() {
            info!(partitions = ?deleted_partitions, "Deleted stale partitions");
        }

        let claimed = match self.clients.claim().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Failed to claim clients");
                false
            }
        };

        let config = self.sync.initialize().await;
        let eviction = self.run_eviction(&config).await;

        Ok(ActivationReport {
            deleted_partitions,
            claimed,
            config,
            eviction,
        })
    }

    /// Classify and answer an intercepted request. `Ok(None)` means the
    /// request is not intercepted and the host should let it through.
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    pub async fn handle_fetch(&self, request: InterceptedRequest) -> Result<Option<HttpResponse>> {
        if !request.is_http() {
            debug!("Not intercepting non-http request");
            return Ok(None);
        }

        let category = self.classifier.classify(&request);
        let config = self.current_config().await;
        debug!(%category, "Dispatching request");

        self.dispatcher
            .dispatch(category, &request, &config)
            .await
            .map(Some)
    }

    /// Apply one foreground message. Replies go back to `source` only;
    /// undeliverable replies are logged.
    #[instrument(skip(self, source, payload), fields(client = %source.id()))]
    pub async fn handle_message(
        &self,
        source: Arc<dyn ClientConnection>,
        payload: &Value,
    ) -> Result<()> {
        let message = InboundMessage::parse(payload).inspect_err(|e| {
            warn!(error = %e, "Ignoring unrecognized message");
        })?;
        debug!(kind = message.kind(), "Handling message");

        match message {
            InboundMessage::CleanupCache => {
                let config = self.current_config().await;
                self.run_eviction(&config).await;
            }
            InboundMessage::ClearAudioCache => {
                self.eviction.clear_audio().await?;
            }
            InboundMessage::GetCacheStatus => {
                let config = self.current_config().await;
                let status = self.status().await;
                reply(&source, OutboundMessage::CacheStatus { status, config }).await;
            }
            InboundMessage::DeleteAllCaches => {
                let deleted = self.store.clear_all().await?;
                info!(partitions = ?deleted, "Deleted all caches");
                reply(&source, OutboundMessage::AllCachesDeleted).await;
            }
            InboundMessage::UpdateCacheConfig { config } => {
                let change = self.sync.apply_update(&config).await;
                self.evict_after_change(&change).await;
                reply(
                    &source,
                    OutboundMessage::CacheConfigUpdated {
                        config: change.current,
                    },
                )
                .await;
            }
            InboundMessage::GetCacheConfig | InboundMessage::RequestCacheConfig => {
                let config = self.current_config().await;
                reply(&source, OutboundMessage::CacheConfigResponse { config }).await;
            }
            InboundMessage::CacheConfigFromPage { config } => {
                let change = self.sync.apply_from_page(&config).await;
                self.evict_after_change(&change).await;
            }
            InboundMessage::RegisterPage { page_path } => {
                self.register_page(&page_path).await?;
            }
        }

        Ok(())
    }

    /// Run an eviction pass for the maintenance tag; other tags are ignored.
    #[instrument(skip(self))]
    pub async fn handle_periodic_sync(&self, tag: &str) -> Result<Option<EvictionReport>> {
        if tag != CLEANUP_SYNC_TAG {
            debug!("Ignoring unknown sync tag");
            return Ok(None);
        }
        let config = self.current_config().await;
        Ok(Some(self.eviction.run_pass(&config).await?))
    }

    /// Track `page_path` and pre-warm it into the shell partition. Returns
    /// `true` when the page was newly stored. A page whose pre-warm fails is
    /// not kept as tracked, so the next registration fetches it again.
    pub async fn register_page(&self, page_path: &str) -> Result<bool> {
        if page_path.is_empty() || !self.pages.register(page_path) {
            return Ok(false);
        }

        let url = match self.scope.join(page_path) {
            Ok(url) => url,
            Err(e) => {
                self.pages.forget(page_path);
                return Err(e.into());
            }
        };

        info!(page = %page_path, "Registering page");
        match self.prewarm(&url, &navigation_key(&url)).await {
            Ok(()) => Ok(true),
            Err(e) => {
                warn!(page = %page_path, error = %e, "Failed to pre-warm page");
                self.pages.forget(page_path);
                Ok(false)
            }
        }
    }

    /// Diagnostics snapshot; storage failures yield an empty report with the
    /// error text.
    pub async fn status(&self) -> CacheStatusReport {
        let config = self.current_config().await;
        match self.diagnostics.collect(&config).await {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "Failed to collect cache status");
                CacheStatusReport::failed(config, e.to_string())
            }
        }
    }

    /// Wait for tracked background revalidations to finish.
    pub async fn wait_for_background(&self) {
        self.dispatcher.context().revalidator.wait_idle().await;
    }

    async fn evict_after_change(&self, change: &ConfigChange) {
        if change.requires_eviction() {
            debug!(previous = ?change.previous, current = ?change.current, "Policy change requires eviction");
            self.run_eviction(&change.current).await;
        }
    }

    async fn run_eviction(&self, config: &CacheConfig) -> Option<EvictionReport> {
        match self.eviction.run_pass(config).await {
            Ok(report) => Some(report),
            Err(e) => {
                warn!(error = %e, "Eviction pass failed");
                None
            }
        }
    }
}

async fn reply(source: &Arc<dyn ClientConnection>, message: OutboundMessage) {
    if let Err(e) = source.post_message(message.to_value()).await {
        warn!(client = %source.id(), error = %e, "Failed to deliver reply");
    }
}
