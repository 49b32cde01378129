//! Full-page loads: network raced against a timeout, shell fallbacks.

use bridge_traits::{CacheMode, HttpResponse};
use tracing::{debug, instrument, warn};

use super::{placeholder, StrategyContext};
use crate::error::{CacheError, Result};
use crate::request::{navigation_key, InterceptedRequest};
use crate::store::Partition;

fn is_html(response: &HttpResponse) -> bool {
    response
        .content_type()
        .is_some_and(|ct| ct.to_ascii_lowercase().contains("text/html"))
}

#[instrument(skip(ctx, request), fields(url = %request.url))]
pub(super) async fn handle(ctx: &StrategyContext, request: &InterceptedRequest) -> Result<HttpResponse> {
    let page_key = navigation_key(&request.url);

    let network = tokio::time::timeout(
        ctx.navigation_timeout,
        ctx.fetch(request, CacheMode::Default),
    )
    .await
    .unwrap_or_else(|_| Err(CacheError::TimeoutExceeded(ctx.navigation_timeout)));

    let answered = match network {
        Ok(response) if response.is_success() => {
            if request.is_storable() && is_html(&response) {
                if let Err(e) = ctx.store.put(Partition::Shell, &page_key, &response).await {
                    warn!(error = %e, "Failed to store navigation response");
                }
            }
            return Ok(response);
        }
        Ok(response) => {
            debug!(status = response.status, "Navigation answered with an error status");
            Some(response)
        }
        Err(e) => {
            debug!(error = %e, "Navigation network leg failed");
            None
        }
    };

    if let Some((_, page)) = ctx.store.lookup(&[Partition::Shell], &page_key, false).await {
        return Ok(page);
    }

    let index_key = navigation_key(&ctx.scope);
    if index_key != page_key {
        if let Some((_, index)) = ctx.store.lookup(&[Partition::Shell], &index_key, false).await {
            debug!("Serving shell index for navigation");
            return Ok(index);
        }
    }

    Ok(answered.unwrap_or_else(placeholder::offline_page))
}
