//! Background revalidation of cache hits.
//!
//! A hit is served immediately; a tracked task then refetches the resource
//! with the HTTP cache bypassed and overwrites the entry if the fresh answer
//! is OK and of a compatible content type.

use bridge_traits::{CacheKey, HttpClient, HttpRequest, HttpResponse};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use crate::store::{Partition, PartitionedStore};

/// Content type the stored entry was written with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectedContent {
    Html,
    MediaType(String),
    Any,
}

fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

impl ExpectedContent {
    pub fn of(response: &HttpResponse) -> Self {
        match response.content_type().map(essence) {
            Some(media) if media == "text/html" => ExpectedContent::Html,
            Some(media) if !media.is_empty() => ExpectedContent::MediaType(media),
            _ => ExpectedContent::Any,
        }
    }

    /// HTML may only be replaced by HTML, and nothing else by HTML.
    pub fn accepts(&self, fresh: &HttpResponse) -> bool {
        let media = fresh.content_type().map(essence);
        let is_html = media.as_deref() == Some("text/html");

        match self {
            ExpectedContent::Html => is_html,
            ExpectedContent::Any => !is_html,
            ExpectedContent::MediaType(expected) => match media.as_deref() {
                Some(actual) if actual == expected.as_str() => true,
                Some(actual) => !is_html && top_level(actual) == top_level(expected),
                None => false,
            },
        }
    }
}

fn top_level(media: &str) -> &str {
    media.split('/').next().unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevalidationOutcome {
    Updated,
    Rejected(String),
    Failed(String),
}

/// Spawns and tracks revalidation tasks. The response path never awaits them.
#[derive(Clone)]
pub struct BackgroundRevalidator {
    tracker: TaskTracker,
    /// One `wait_idle` at a time; the tracker is closed while it runs.
    waiters: Arc<Mutex<()>>,
    http: Arc<dyn HttpClient>,
    store: PartitionedStore,
}

impl BackgroundRevalidator {
    pub fn new(http: Arc<dyn HttpClient>, store: PartitionedStore) -> Self {
        Self {
            tracker: TaskTracker::new(),
            waiters: Arc::new(Mutex::new(())),
            http,
            store,
        }
    }

    pub fn spawn(
        &self,
        request: HttpRequest,
        partition: Partition,
        key: CacheKey,
        expected: ExpectedContent,
    ) {
        let http = Arc::clone(&self.http);
        let store = self.store.clone();
        self.tracker.spawn(async move {
            let outcome = revalidate(http.as_ref(), &store, request, partition, &key, &expected).await;
            debug!(key = %key, ?outcome, "Background revalidation finished");
        });
    }

    /// Number of revalidations still running.
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    /// Wait until every task spawned so far has finished. Concurrent callers
    /// take turns.
    pub async fn wait_idle(&self) {
        let _turn = self.waiters.lock().await;
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}

pub async fn revalidate(
    http: &dyn HttpClient,
    store: &PartitionedStore,
    request: HttpRequest,
    partition: Partition,
    key: &CacheKey,
    expected: &ExpectedContent,
) -> RevalidationOutcome {
    let fresh = match http.execute(request.bypass_cache()).await {
        Ok(response) if response.is_success() => response,
        Ok(response) => return RevalidationOutcome::Failed(format!("status {}", response.status)),
        Err(e) => return RevalidationOutcome::Failed(e.to_string()),
    };

    if !expected.accepts(&fresh) {
        let actual = fresh.content_type().unwrap_or("none").to_string();
        debug!(key = %key, ?expected, %actual, "Refusing incompatible revalidation");
        return RevalidationOutcome::Rejected(actual);
    }

    match store.put(partition, key, &fresh).await {
        Ok(()) => RevalidationOutcome::Updated,
        Err(e) => {
            warn!(key = %key, error = %e, "Failed to store revalidated response");
            RevalidationOutcome::Failed(e.to_string())
        }
    }
}
