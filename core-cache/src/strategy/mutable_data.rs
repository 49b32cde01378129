//! Frequently changing data files: network first, write-through to data.
//! With neither network nor a cached copy the answer is a 503 JSON error.

use bridge_traits::{CacheMode, HttpResponse};
use tracing::{debug, instrument, warn};

use super::{placeholder, StrategyContext};
use crate::error::Result;
use crate::request::InterceptedRequest;
use crate::store::Partition;

#[instrument(skip(ctx, request), fields(url = %request.url))]
pub(super) async fn handle(ctx: &StrategyContext, request: &InterceptedRequest) -> Result<HttpResponse> {
    let key = request.cache_key();

    match ctx.fetch_ok(request, CacheMode::Reload).await {
        Ok(response) => {
            if request.is_storable() {
                if let Err(e) = ctx.store.put(Partition::Data, &key, &response).await {
                    warn!(error = %e, "Failed to write through data file");
                }
            }
            Ok(response)
        }
        Err(e) => {
            debug!(error = %e, "Data file network leg failed, reading cache");
            match ctx.store.lookup(&Partition::DATA_THEN_SHELL, &key, true).await {
                Some((_, cached)) => Ok(cached),
                None => {
                    warn!("Data file unavailable from network and cache");
                    Ok(placeholder::data_unavailable())
                }
            }
        }
    }
}
