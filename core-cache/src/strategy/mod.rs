//! # Strategy Dispatcher
//!
//! One handler per [`RequestCategory`]. Each handler is a short state machine
//! over network, timeout and store operations with its own fallback order:
//!
//! | Category | Order |
//! |----------|-------|
//! | Navigation | network (bounded) → shell page → shell index → offline page |
//! | Mutable data | network (bypass) → data → shell → error |
//! | Large static data | data → shell → network → placeholder |
//! | Audio | data → network → 404 |
//! | Static asset | shell → data (+ revalidate) → network → GIF / 404 |
//! | Other | network → data → shell → error |

mod audio;
mod large_static;
mod mutable_data;
mod navigation;
mod other;
pub mod placeholder;
pub mod revalidate;
mod static_asset;

use bridge_traits::{CacheMode, HttpClient, HttpResponse};
use core_runtime::config::LargeStaticPlaceholder;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::classifier::{RequestCategory, RequestClassifier};
use crate::error::{CacheError, Result};
use crate::eviction::EvictionManager;
use crate::policy::CacheConfig;
use crate::request::InterceptedRequest;
use crate::store::PartitionedStore;

pub use revalidate::{BackgroundRevalidator, ExpectedContent, RevalidationOutcome};

/// Everything a handler may touch.
pub struct StrategyContext {
    pub http: Arc<dyn HttpClient>,
    pub store: PartitionedStore,
    pub classifier: Arc<RequestClassifier>,
    pub eviction: Arc<EvictionManager>,
    pub revalidator: BackgroundRevalidator,
    pub scope: Url,
    pub navigation_timeout: Duration,
    pub max_static_asset_bytes: u64,
    pub large_static_placeholder: LargeStaticPlaceholder,
}

impl StrategyContext {
    /// Single network attempt. Any HTTP status is `Ok`.
    async fn fetch(&self, request: &InterceptedRequest, mode: CacheMode) -> Result<HttpResponse> {
        let response = self
            .http
            .execute(request.to_http_request(mode))
            .await
            .map_err(|e| CacheError::NetworkFailure(e.to_string()))?;
        debug!(status = response.status, "Network answered");
        Ok(response)
    }

    /// Like [`fetch`](Self::fetch) but a non-OK status is a failure too.
    async fn fetch_ok(&self, request: &InterceptedRequest, mode: CacheMode) -> Result<HttpResponse> {
        let response = self.fetch(request, mode).await?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(CacheError::NetworkFailure(format!(
                "{} answered {}",
                request.url, response.status
            )))
        }
    }
}

pub struct StrategyDispatcher {
    context: StrategyContext,
}

impl StrategyDispatcher {
    pub fn new(context: StrategyContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &StrategyContext {
        &self.context
    }

    /// Route `request` to its handler using one policy snapshot.
    pub async fn dispatch(
        &self,
        category: RequestCategory,
        request: &InterceptedRequest,
        config: &CacheConfig,
    ) -> Result<HttpResponse> {
        let ctx = &self.context;
        match category {
            RequestCategory::Navigation => navigation::handle(ctx, request).await,
            RequestCategory::MutableData => mutable_data::handle(ctx, request).await,
            RequestCategory::LargeStaticData => large_static::handle(ctx, request).await,
            RequestCategory::Audio => audio::handle(ctx, request, config).await,
            RequestCategory::StaticAsset => static_asset::handle(ctx, request).await,
            RequestCategory::Other => other::handle(ctx, request, config).await,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::manifest::ProtectedFileSet;
    use async_trait::async_trait;
    use bridge_desktop::MemoryCacheStorage;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::HttpRequest;
    use core_runtime::config::{AssetManifest, PartitionNames};
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Canned responses by URL; unknown URLs fail like an unreachable host.
    #[derive(Default)]
    pub struct ScriptedHttp {
        routes: Mutex<HashMap<String, HttpResponse>>,
        delay: Mutex<Option<Duration>>,
        pub calls: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedHttp {
        pub fn route(&self, url: &str, response: HttpResponse) {
            self.routes.lock().insert(url.to_string(), response);
        }

        pub fn unroute(&self, url: &str) {
            self.routes.lock().remove(url);
        }

        pub fn delay(&self, delay: Duration) {
            *self.delay.lock() = Some(delay);
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().len()
        }
    }

    #[async_trait]
    impl HttpClient for ScriptedHttp {
        async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
            self.calls.lock().push(request.clone());
            let delay = *self.delay.lock();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let routed = self.routes.lock().get(&request.url).cloned();
            routed.ok_or_else(|| BridgeError::Network(format!("unreachable: {}", request.url)))
        }
    }

    pub const SCOPE: &str = "https://example.com/app/";

    pub fn context(http: Arc<ScriptedHttp>) -> StrategyContext {
        let scope = Url::parse(SCOPE).unwrap();
        let manifest = AssetManifest::new(vec!["./".into()], vec!["./music.json".into()]);
        let store = PartitionedStore::new(Arc::new(MemoryCacheStorage::new()), PartitionNames::default());
        let classifier = Arc::new(RequestClassifier::default());
        let protected = Arc::new(ProtectedFileSet::from_manifest(&scope, &manifest).unwrap());
        let eviction = Arc::new(EvictionManager::new(store.clone(), classifier.clone(), protected));

        StrategyContext {
            http: http.clone(),
            revalidator: BackgroundRevalidator::new(http, store.clone()),
            store,
            classifier,
            eviction,
            scope,
            navigation_timeout: Duration::from_secs(3),
            max_static_asset_bytes: 5 * 1024 * 1024,
            large_static_placeholder: LargeStaticPlaceholder::default(),
        }
    }

    pub fn ok(content_type: &str, body: &'static str) -> HttpResponse {
        HttpResponse::new(200)
            .with_header("Content-Type", content_type)
            .with_body(body)
    }

    pub fn url(path: &str) -> String {
        format!("{}{}", SCOPE, path)
    }
}
