//! Stale-while-revalidate: serve what is stored, refresh it in the background.
//!
//! The refresh runs on the executor's background set, so it outlives the
//! caller. On a miss the caller waits for that same refresh over a oneshot.

use std::sync::Arc;

use swcache_core::{CacheStorage, Error, StoreName};
use tokio::sync::oneshot;

use super::executor::{PolicyExecutor, store_copy};
use crate::fetch::{FetchResponse, Fetcher};
use crate::request::InterceptedRequest;
use crate::response::ServedResponse;

impl PolicyExecutor {
    pub(super) async fn stale_while_revalidate(
        &self, request: &InterceptedRequest, store: &StoreName,
    ) -> ServedResponse {
        let cached = self.lookup(store, request).await;

        let (tx, rx) = oneshot::channel();
        let storage = Arc::clone(&self.storage);
        let fetcher = Arc::clone(&self.fetcher);
        let store_name = store.clone();
        let background_request = request.clone();

        self.spawn_background(async move {
            let outcome = revalidate(storage.as_ref(), fetcher.as_ref(), &store_name, &background_request).await;
            // Receiver is gone when the caller was served from cache.
            let _ = tx.send(outcome);
        });

        if let Some(entry) = cached {
            tracing::debug!(url = %request.url, store = %store, "serving stale entry, revalidating");
            return ServedResponse::from_cache(entry);
        }

        match rx.await {
            Ok(Ok(response)) => ServedResponse::from_network(response),
            Ok(Err(_)) | Err(_) => ServedResponse::offline("Offline - content not available"),
        }
    }
}

async fn revalidate(
    storage: &dyn CacheStorage, fetcher: &dyn Fetcher, store: &StoreName, request: &InterceptedRequest,
) -> Result<FetchResponse, Error> {
    match fetcher.fetch(request).await {
        Ok(response) => {
            if store_copy(storage, store, request.method.as_str(), &response).await {
                tracing::debug!(url = %request.url, store = %store, "revalidated");
            }
            Ok(response)
        }
        Err(e) => {
            tracing::warn!(url = %request.url, error = %e, "background fetch failed");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use swcache_core::{CachedResponse, StorePurpose};

    use crate::request::InterceptedRequest;
    use crate::response::ResponseSource;
    use crate::strategy::{PolicyExecutor, RequestClass};
    use crate::testing::{self, MockFetcher};

    #[tokio::test]
    async fn test_hit_returns_stale_then_refreshes() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.route("/style.css", 200, "text/css", "body{color:red}");
        let db = testing::storage().await;
        let store = testing::generation().store(StorePurpose::Static);
        db.put_entry(
            &store,
            &CachedResponse::new("GET", testing::url("/style.css").as_str(), 200, vec![], b"body{}".to_vec()),
        )
        .await
        .unwrap();

        let executor = PolicyExecutor::new(db, fetcher.clone(), testing::generation(), testing::url("/index.html"));
        let request = InterceptedRequest::get(testing::url("/style.css"));

        fetcher.hold();
        let first = tokio::time::timeout(Duration::from_secs(2), executor.execute(&request, RequestClass::Static.policy()))
            .await
            .expect("cached response must not wait for the network");
        assert_eq!(first.source, ResponseSource::Cache);
        assert_eq!(first.text(), "body{}");
        assert_eq!(executor.pending_background(), 1);

        fetcher.release();
        assert_eq!(executor.drain_background().await, 1);

        let second = executor.execute(&request, RequestClass::Static.policy()).await;
        assert_eq!(second.source, ResponseSource::Cache);
        assert_eq!(second.text(), "body{color:red}");
        executor.drain_background().await;
        assert_eq!(fetcher.calls("/style.css"), 2);
    }

    #[tokio::test]
    async fn test_miss_waits_for_network() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.route("/puzzle1/dist/js/quiz.js", 200, "text/javascript", "quiz()");
        let db = testing::storage().await;
        let executor = PolicyExecutor::new(db.clone(), fetcher, testing::generation(), testing::url("/index.html"));

        let request = InterceptedRequest::get(testing::url("/puzzle1/dist/js/quiz.js"));
        let response = executor.execute(&request, RequestClass::Static.policy()).await;
        assert_eq!(response.source, ResponseSource::Network);
        assert_eq!(response.text(), "quiz()");

        executor.drain_background().await;
        let store = testing::generation().store(StorePurpose::Static);
        assert!(db.match_entry(&store, "GET", request.url.as_str()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_offline_miss_is_503() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.set_offline(true);
        let executor =
            PolicyExecutor::new(testing::storage().await, fetcher, testing::generation(), testing::url("/index.html"));

        let request = InterceptedRequest::get(testing::url("/fonts/orbitron.woff2"));
        let response = executor.execute(&request, RequestClass::Static.policy()).await;
        assert_eq!(response.status, 503);
        assert_eq!(response.text(), "Offline - content not available");
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_stale_entry() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.set_offline(true);
        let db = testing::storage().await;
        let store = testing::generation().store(StorePurpose::Static);
        db.put_entry(
            &store,
            &CachedResponse::new("GET", testing::url("/style.css").as_str(), 200, vec![], b"body{}".to_vec()),
        )
        .await
        .unwrap();
        let executor = PolicyExecutor::new(db.clone(), fetcher, testing::generation(), testing::url("/index.html"));

        let request = InterceptedRequest::get(testing::url("/style.css"));
        let response = executor.execute(&request, RequestClass::Static.policy()).await;
        assert_eq!(response.text(), "body{}");
        executor.drain_background().await;

        let stored = db.match_entry(&store, "GET", request.url.as_str()).await.unwrap().unwrap();
        assert_eq!(stored.body, b"body{}");
    }
}
