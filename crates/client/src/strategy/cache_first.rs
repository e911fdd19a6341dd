//! Cache-first: a stored entry is served without touching the network.

use swcache_core::StoreName;

use super::executor::{PolicyExecutor, store_copy};
use crate::request::InterceptedRequest;
use crate::response::ServedResponse;

impl PolicyExecutor {
    pub(super) async fn cache_first(&self, request: &InterceptedRequest, store: &StoreName) -> ServedResponse {
        if let Some(entry) = self.lookup(store, request).await {
            tracing::debug!(url = %request.url, store = %store, "cache hit");
            return ServedResponse::from_cache(entry);
        }

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                store_copy(self.storage.as_ref(), store, request.method.as_str(), &response).await;
                ServedResponse::from_network(response)
            }
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "cache-first fetch failed");
                ServedResponse::offline("Offline - content not cached")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use swcache_core::StorePurpose;

    use crate::response::ResponseSource;
    use crate::strategy::{PolicyExecutor, RequestClass};
    use crate::testing::{self, MockFetcher};
    use crate::request::InterceptedRequest;

    #[tokio::test]
    async fn test_second_request_makes_no_network_call() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.route("/puzzle1/assets/img/bottle_img.jpg", 200, "image/jpeg", "jpeg-bytes");
        let db = testing::storage().await;
        let executor = PolicyExecutor::new(db.clone(), fetcher.clone(), testing::generation(), testing::url("/index.html"));
        let request = InterceptedRequest::get(testing::url("/puzzle1/assets/img/bottle_img.jpg"));

        let first = executor.execute(&request, RequestClass::Images.policy()).await;
        assert_eq!(first.source, ResponseSource::Network);
        assert_eq!(&first.body[..], b"jpeg-bytes");

        let second = executor.execute(&request, RequestClass::Images.policy()).await;
        assert_eq!(second.source, ResponseSource::Cache);
        assert_eq!(&second.body[..], b"jpeg-bytes");
        assert_eq!(fetcher.calls("/puzzle1/assets/img/bottle_img.jpg"), 1);

        let store = testing::generation().store(StorePurpose::Images);
        assert!(db.match_entry(&store, "GET", request.url.as_str()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_offline_miss_is_503() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.set_offline(true);
        let executor =
            PolicyExecutor::new(testing::storage().await, fetcher, testing::generation(), testing::url("/index.html"));

        let request = InterceptedRequest::get(testing::url("/logo.png"));
        let response = executor.execute(&request, RequestClass::Images.policy()).await;
        assert_eq!(response.status, 503);
        assert_eq!(response.source, ResponseSource::Offline);
        assert_eq!(response.text(), "Offline - content not cached");
    }

    #[tokio::test]
    async fn test_error_status_returned_but_not_stored() {
        let fetcher = Arc::new(MockFetcher::new());
        let executor =
            PolicyExecutor::new(testing::storage().await, fetcher.clone(), testing::generation(), testing::url("/index.html"));

        let request = InterceptedRequest::get(testing::url("/missing.png"));
        let first = executor.execute(&request, RequestClass::Images.policy()).await;
        assert_eq!(first.status, 404);

        let second = executor.execute(&request, RequestClass::Images.policy()).await;
        assert_eq!(second.status, 404);
        assert_eq!(fetcher.calls("/missing.png"), 2);
    }

    #[tokio::test]
    async fn test_opaque_response_not_stored() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.route_absolute("https://cdn.jsdelivr.net/logo.svg", 200, "image/svg+xml", "<svg/>");
        let executor =
            PolicyExecutor::new(testing::storage().await, fetcher.clone(), testing::generation(), testing::url("/index.html"));

        let request = InterceptedRequest::get(url::Url::parse("https://cdn.jsdelivr.net/logo.svg").unwrap());
        executor.execute(&request, RequestClass::Images.policy()).await;
        executor.execute(&request, RequestClass::Images.policy()).await;
        assert_eq!(fetcher.calls_absolute("https://cdn.jsdelivr.net/logo.svg"), 2);
    }
}
