//! Default bucket: network first, bounded write into data. Error answers
//! from the server are returned as-is when nothing is cached.

use bridge_traits::{CacheMode, HttpResponse};
use tracing::{debug, instrument, warn};

use super::StrategyContext;
use crate::error::Result;
use crate::policy::CacheConfig;
use crate::request::InterceptedRequest;
use crate::store::{Partition, SkipReason, StoreOutcome};

#[instrument(skip(ctx, request, config), fields(url = %request.url))]
pub(super) async fn handle(
    ctx: &StrategyContext,
    request: &InterceptedRequest,
    config: &CacheConfig,
) -> Result<HttpResponse> {
    let failure = match ctx.fetch(request, CacheMode::Default).await {
        Ok(response) if response.is_success() => {
            let outcome = store(ctx, request, &response, config).await;
            debug!(?outcome, "Other store outcome");
            return Ok(response);
        }
        unanswered_or_error => unanswered_or_error,
    };

    if let Some((_, cached)) = ctx
        .store
        .lookup(&Partition::DATA_THEN_SHELL, &request.cache_key(), false)
        .await
    {
        debug!("Serving cached copy after failed network attempt");
        return Ok(cached);
    }

    // The server's error answer if it replied, the transport error otherwise.
    failure
}

async fn store(
    ctx: &StrategyContext,
    request: &InterceptedRequest,
    response: &HttpResponse,
    config: &CacheConfig,
) -> StoreOutcome {
    if !request.is_storable() {
        return StoreOutcome::Skipped(SkipReason::NotGet);
    }

    match ctx.eviction.other_count().await {
        Ok(count) if count < config.max_other_cache_count as usize => {}
        Ok(_) => return StoreOutcome::Skipped(SkipReason::CeilingReached),
        Err(e) => {
            warn!(error = %e, "Could not count cached entries");
            return StoreOutcome::Skipped(SkipReason::CeilingReached);
        }
    }

    match ctx.store.put(Partition::Data, &request.cache_key(), response).await {
        Ok(()) => StoreOutcome::Stored,
        Err(e) => {
            warn!(error = %e, "Failed to store response");
            StoreOutcome::Skipped(SkipReason::WriteFailed)
        }
    }
}
