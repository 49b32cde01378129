//! The bulk data file: cache first, one fetch on miss, placeholder offline.

use bridge_traits::{CacheMode, HttpResponse};
use tracing::{debug, instrument, warn};

use super::{placeholder, StrategyContext};
use crate::error::Result;
use crate::request::InterceptedRequest;
use crate::store::Partition;

#[instrument(skip(ctx, request), fields(url = %request.url))]
pub(super) async fn handle(ctx: &StrategyContext, request: &InterceptedRequest) -> Result<HttpResponse> {
    let key = request.cache_key();

    if let Some((_, cached)) = ctx.store.lookup(&Partition::DATA_THEN_SHELL, &key, true).await {
        return Ok(cached);
    }

    match ctx.fetch_ok(request, CacheMode::Default).await {
        Ok(response) => {
            if request.is_storable() {
                if let Err(e) = ctx.store.put(Partition::Data, &key, &response).await {
                    warn!(error = %e, "Failed to store bulk data file");
                }
            }
            Ok(response)
        }
        Err(e) => {
            debug!(error = %e, "Bulk data file unavailable, serving placeholder");
            Ok(placeholder::large_static(&ctx.large_static_placeholder))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    use std::sync::Arc;

    #[tokio::test]
    async fn test_second_request_skips_network() {
        let http = Arc::new(ScriptedHttp::default());
        http.route(&url("data.json"), ok("application/json", "{\"big\":true}"));
        let ctx = context(http.clone());
        let request = InterceptedRequest::get(&url("data.json")).unwrap();

        let first = handle(&ctx, &request).await.unwrap();
        let second = handle(&ctx, &request).await.unwrap();

        assert_eq!(http.call_count(), 1);
        assert_eq!(ctx.store.keys(Partition::Data).await.unwrap().len(), 1);
        assert_eq!(first.body, second.body);
    }

    #[tokio::test]
    async fn test_total_failure_serves_placeholder() {
        let ctx = context(Arc::new(ScriptedHttp::default()));

        let response = handle(&ctx, &InterceptedRequest::get(&url("data.json")).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(&response.body[..], b"{}");
        assert!(ctx.store.keys(Partition::Data).await.unwrap().is_empty());
    }
}
