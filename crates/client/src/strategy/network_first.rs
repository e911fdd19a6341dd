//! Network-first: fresh content when reachable, stored copies when not.

use swcache_core::StoreName;

use super::executor::{PolicyExecutor, store_copy};
use crate::request::InterceptedRequest;
use crate::response::ServedResponse;

impl PolicyExecutor {
    pub(super) async fn network_first(&self, request: &InterceptedRequest, store: &StoreName) -> ServedResponse {
        let err = match self.fetcher.fetch(request).await {
            Ok(response) => {
                store_copy(self.storage.as_ref(), store, request.method.as_str(), &response).await;
                return ServedResponse::from_network(response);
            }
            Err(e) => e,
        };

        tracing::info!(url = %request.url, error = %err, "network failed, serving from cache");

        if let Some(entry) = self.lookup(store, request).await {
            return ServedResponse::from_cache(entry);
        }

        if request.is_navigation()
            && let Some(fallback) = self.fallback_document().await
        {
            tracing::debug!(url = %request.url, fallback = %self.navigation_fallback, "serving navigation fallback");
            return ServedResponse::navigation_fallback(fallback);
        }

        ServedResponse::offline("Offline - no cached content available")
    }
}
