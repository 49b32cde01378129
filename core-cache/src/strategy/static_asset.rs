//! Static assets: cache first with background revalidation.

use bridge_traits::{CacheMode, HttpResponse};
use tracing::{debug, instrument, warn};

use super::{placeholder, ExpectedContent, StrategyContext};
use crate::error::Result;
use crate::request::InterceptedRequest;
use crate::store::{Partition, SkipReason, StoreOutcome};

const CACHEABLE_TYPES: [&str; 4] = ["font", "image", "css", "script"];

/// Admission rule for writing a fresh asset into the shell partition.
fn admit(request: &InterceptedRequest, response: &HttpResponse, max_bytes: u64) -> StoreOutcome {
    if !response.is_success() {
        return StoreOutcome::Skipped(SkipReason::NotOk(response.status));
    }
    if !request.is_storable() {
        return StoreOutcome::Skipped(SkipReason::NotGet);
    }

    let content_type = response.content_type().unwrap_or_default().to_ascii_lowercase();
    if !CACHEABLE_TYPES.iter().any(|t| content_type.contains(t)) {
        return StoreOutcome::Skipped(SkipReason::ContentType);
    }
    if response.content_length().is_some_and(|len| len >= max_bytes) {
        return StoreOutcome::Skipped(SkipReason::TooLarge);
    }
    StoreOutcome::Stored
}

#[instrument(skip(ctx, request), fields(url = %request.url))]
pub(super) async fn handle(ctx: &StrategyContext, request: &InterceptedRequest) -> Result<HttpResponse> {
    let key = request.cache_key();

    if let Some((partition, cached)) = ctx.store.lookup(&Partition::SHELL_THEN_DATA, &key, true).await {
        ctx.revalidator.spawn(
            request.to_http_request(CacheMode::Reload),
            partition,
            key,
            ExpectedContent::of(&cached),
        );
        return Ok(cached);
    }

    match ctx.fetch(request, CacheMode::Default).await {
        Ok(response) => {
            match admit(request, &response, ctx.max_static_asset_bytes) {
                StoreOutcome::Stored => {
                    if let Err(e) = ctx.store.put(Partition::Shell, &key, &response).await {
                        warn!(error = %e, "Failed to store static asset");
                    }
                }
                StoreOutcome::Skipped(reason) => debug!(%reason, "Static asset not stored"),
            }
            Ok(response)
        }
        Err(e) => {
            debug!(error = %e, "Static asset unavailable");
            if ctx.classifier.is_image(&request.url) {
                Ok(placeholder::transparent_gif())
            } else {
                Ok(placeholder::not_found())
            }
        }
    }
}
