//! Shared fixtures for core-cache integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_desktop::{ChannelClientRegistry, MemoryCacheStorage};
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::{HttpClient, HttpRequest, HttpResponse, SettingsStore};
use core_cache::OfflineCacheController;
use core_runtime::config::{AssetManifest, ProxyConfig};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub const SCOPE: &str = "https://example.com/app/";
pub const SHELL: &str = "app-shell-v1";
pub const DATA: &str = "data-cache-v1";

pub fn url(path: &str) -> String {
    format!("{}{}", SCOPE, path)
}

pub fn ok(content_type: &str, body: impl Into<bytes::Bytes>) -> HttpResponse {
    HttpResponse::new(200)
        .with_header("Content-Type", content_type)
        .with_body(body)
}

/// Canned responses by exact URL; anything else fails like an unreachable host.
#[derive(Default)]
pub struct ScriptedHttp {
    routes: Mutex<HashMap<String, HttpResponse>>,
    delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<HttpRequest>>,
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

    pub fn calls(&self) -> Vec<HttpRequest> {
        self.calls.lock().clone()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().iter().filter(|r| r.url == url).count()
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

/// Settings kept in a map; avoids a database under paused time.
#[derive(Default)]
pub struct MapSettings {
    values: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl SettingsStore for MapSettings {
    async fn set_string(&self, key: &str, value: &str) -> BridgeResult<()> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get_string(&self, key: &str) -> BridgeResult<Option<String>> {
        Ok(self.values.lock().get(key).cloned())
    }

    async fn delete(&self, key: &str) -> BridgeResult<()> {
        self.values.lock().remove(key);
        Ok(())
    }

    async fn list_keys(&self) -> BridgeResult<Vec<String>> {
        Ok(self.values.lock().keys().cloned().collect())
    }

    async fn clear_all(&self) -> BridgeResult<()> {
        self.values.lock().clear();
        Ok(())
    }
}

pub fn manifest() -> AssetManifest {
    AssetManifest::new(
        vec!["./".into(), "./index.html".into(), "./style.css".into()],
        vec!["./music.json".into(), "./data.json".into()],
    )
}

pub struct Harness {
    pub controller: OfflineCacheController,
    pub storage: Arc<MemoryCacheStorage>,
    pub settings: Arc<dyn SettingsStore>,
    pub clients: Arc<ChannelClientRegistry>,
}

pub fn harness_with(http: Arc<dyn HttpClient>, settings: Arc<dyn SettingsStore>) -> Harness {
    let storage = Arc::new(MemoryCacheStorage::new());
    let clients = Arc::new(ChannelClientRegistry::new());

    let config = ProxyConfig::builder()
        .scope(SCOPE)
        .manifest(manifest())
        .http_client(http)
        .cache_storage(storage.clone())
        .settings_store(settings.clone())
        .client_registry(clients.clone())
        .build()
        .expect("valid proxy config");

    Harness {
        controller: OfflineCacheController::new(config).expect("controller"),
        storage,
        settings,
        clients,
    }
}

pub fn harness(http: Arc<ScriptedHttp>) -> Harness {
    harness_with(http, Arc::new(MapSettings::default()))
}
