//! Audio: cache first under a count ceiling, never an error.

use bridge_traits::{CacheMode, HttpResponse};
use tracing::{debug, info, instrument, warn};

use super::{placeholder, StrategyContext};
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
    if !config.audio_caching_active() {
        debug!("Audio caching disabled, going straight to network");
        return Ok(ctx
            .fetch(request, CacheMode::Default)
            .await
            .unwrap_or_else(|_| placeholder::not_found()));
    }

    let key = request.cache_key();
    match ctx.store.get(Partition::Data, &key).await {
        Ok(Some(cached)) => return Ok(cached),
        Ok(None) => {}
        Err(e) => warn!(error = %e, "Audio cache read failed"),
    }

    let response = match ctx.fetch(request, CacheMode::Default).await {
        Ok(response) => response,
        Err(e) => {
            debug!(error = %e, "Audio fetch failed");
            return Ok(placeholder::not_found());
        }
    };

    if response.is_success() {
        let outcome = store(ctx, request, &response, config).await;
        debug!(?outcome, "Audio store outcome");
    }
    Ok(response)
}

async fn store(
    ctx: &StrategyContext,
    request: &InterceptedRequest,
    response: &HttpResponse,
    config: &CacheConfig,
) -> StoreOutcome {
    if !config.audio_caching_active() {
        return StoreOutcome::Skipped(SkipReason::AudioDisabled);
    }
    if !request.is_storable() {
        return StoreOutcome::Skipped(SkipReason::NotGet);
    }

    let ceiling = config.max_audio_cache_count as usize;
    if !has_room(ctx, ceiling).await {
        info!(ceiling, "Audio cache full, evicting");
        if let Err(e) = ctx.eviction.run_pass_with_headroom(config, 1).await {
            warn!(error = %e, "Eviction before audio store failed");
        }
        if !has_room(ctx, ceiling).await {
            return StoreOutcome::Skipped(SkipReason::CeilingReached);
        }
    }

    match ctx.store.put(Partition::Data, &request.cache_key(), response).await {
        Ok(()) => StoreOutcome::Stored,
        Err(e) => {
            warn!(error = %e, "Failed to store audio");
            StoreOutcome::Skipped(SkipReason::WriteFailed)
        }
    }
}

async fn has_room(ctx: &StrategyContext, ceiling: usize) -> bool {
    match ctx.eviction.audio_count().await {
        Ok(count) => count < ceiling,
        Err(e) => {
            warn!(error = %e, "Could not count audio entries");
            false
        }
    }
}
