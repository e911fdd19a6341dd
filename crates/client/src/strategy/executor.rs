//! Policy execution.
//!
//! Executors never surface an error to the page: store failures read as
//! misses, write failures are logged and dropped, and a request that gets
//! neither a network nor a cached response ends in a synthetic 503.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use swcache_core::{CacheStorage, CachedResponse, Generation, StoreName};
use tokio::task::JoinSet;
use url::Url;

use super::{PolicyConfig, StrategyKind};
use crate::fetch::{FetchResponse, Fetcher};
use crate::request::InterceptedRequest;
use crate::response::ServedResponse;

/// Runs the configured strategy for intercepted requests of one generation.
pub struct PolicyExecutor {
    pub(super) storage: Arc<dyn CacheStorage>,
    pub(super) fetcher: Arc<dyn Fetcher>,
    pub(super) generation: Generation,
    pub(super) navigation_fallback: Url,
    /// Detached revalidations; dropping a page's response future never cancels these.
    background: Mutex<JoinSet<()>>,
}

impl PolicyExecutor {
    pub fn new(
        storage: Arc<dyn CacheStorage>, fetcher: Arc<dyn Fetcher>, generation: Generation, navigation_fallback: Url,
    ) -> Self {
        Self { storage, fetcher, generation, navigation_fallback, background: Mutex::new(JoinSet::new()) }
    }

    pub fn generation(&self) -> &Generation {
        &self.generation
    }

    /// Serve one request with the given policy.
    pub async fn execute(&self, request: &InterceptedRequest, policy: PolicyConfig) -> ServedResponse {
        let store = self.generation.store(policy.store);

        tracing::debug!(
            url = %request.url,
            class = %policy.class,
            strategy = %policy.strategy,
            store = %store,
            "executing policy"
        );

        match policy.strategy {
            StrategyKind::CacheFirst => self.cache_first(request, &store).await,
            StrategyKind::NetworkFirst => self.network_first(request, &store).await,
            StrategyKind::StaleWhileRevalidate => self.stale_while_revalidate(request, &store).await,
        }
    }

    /// Look up the request in one store. Read failures count as a miss.
    pub(super) async fn lookup(&self, store: &StoreName, request: &InterceptedRequest) -> Option<CachedResponse> {
        match self
            .storage
            .match_entry(store, request.method.as_str(), request.url.as_str())
            .await
        {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(store = %store, url = %request.url, error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    /// Look up the navigation fallback document across this generation's stores.
    pub(super) async fn fallback_document(&self) -> Option<CachedResponse> {
        match self
            .storage
            .match_in_generation(&self.generation, "GET", self.navigation_fallback.as_str())
            .await
        {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(url = %self.navigation_fallback, error = %e, "fallback lookup failed");
                None
            }
        }
    }

    pub(super) fn spawn_background<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.background.lock().unwrap_or_else(PoisonError::into_inner);
        while let Some(finished) = tasks.try_join_next() {
            if let Err(e) = finished {
                tracing::warn!(error = %e, "background revalidation panicked");
            }
        }
        tasks.spawn(task);
    }

    /// Wait for every pending background revalidation. Returns how many finished.
    pub async fn drain_background(&self) -> usize {
        let mut drained = 0;
        loop {
            let mut tasks = {
                let mut guard = self.background.lock().unwrap_or_else(PoisonError::into_inner);
                std::mem::take(&mut *guard)
            };
            if tasks.is_empty() {
                return drained;
            }
            while let Some(finished) = tasks.join_next().await {
                drained += 1;
                if let Err(e) = finished {
                    tracing::warn!(error = %e, "background revalidation panicked");
                }
            }
        }
    }

    pub fn pending_background(&self) -> usize {
        self.background.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Write a copy of a network response, if it may be stored at all.
///
/// Returns whether the entry was written.
pub(crate) async fn store_copy(
    storage: &dyn CacheStorage, store: &StoreName, method: &str, response: &FetchResponse,
) -> bool {
    if !response.is_cacheable() {
        tracing::debug!(
            url = %response.url,
            status = response.status.as_u16(),
            kind = ?response.kind,
            "response not cacheable, skipping store"
        );
        return false;
    }

    match storage.put_entry(store, &response.to_cached(method)).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(store = %store, url = %response.url, error = %e, "cache write failed");
            false
        }
    }
}
