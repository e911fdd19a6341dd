//! Test doubles shared by the strategy and lifecycle tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{StatusCode, header};
use swcache_core::{CacheDb, CacheStorage, CachedResponse, Error, Generation, GenerationState, StoreInfo, StoreName};
use tokio::sync::Notify;
use url::Url;

use crate::fetch::{FetchResponse, Fetcher, ResponseKind};
use crate::request::{InterceptedRequest, RequestMode};

pub(crate) const ORIGIN: &str = "http://localhost:8080";

pub(crate) fn url(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

pub(crate) fn generation() -> Generation {
    Generation::new("cyberpuzzle", "v2")
}

pub(crate) async fn storage() -> Arc<CacheDb> {
    Arc::new(CacheDb::open_in_memory().await.unwrap())
}

pub(crate) fn response(url: &Url, status: u16, content_type: &str, body: &str) -> FetchResponse {
    let mut headers = header::HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_str(content_type).unwrap());
    FetchResponse {
        url: url.clone(),
        status: StatusCode::from_u16(status).unwrap(),
        bytes: Bytes::copy_from_slice(body.as_bytes()),
        headers,
        kind: ResponseKind::Basic,
    }
}

#[derive(Clone)]
enum Route {
    Respond { status: u16, content_type: String, body: String },
    Fail,
}

/// Scripted network. Unknown URLs answer 404 like a real origin would.
pub(crate) struct MockFetcher {
    routes: Mutex<HashMap<String, Route>>,
    calls: Mutex<HashMap<String, usize>>,
    offline: AtomicBool,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl MockFetcher {
    pub(crate) fn new() -> Self {
        Self {
            routes: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            offline: AtomicBool::new(false),
            gate: Mutex::new(None),
        }
    }

    pub(crate) fn route(&self, path: &str, status: u16, content_type: &str, body: &str) {
        self.route_absolute(url(path).as_str(), status, content_type, body);
    }

    pub(crate) fn route_absolute(&self, url: &str, status: u16, content_type: &str, body: &str) {
        self.routes.lock().unwrap().insert(
            url.to_string(),
            Route::Respond { status, content_type: content_type.to_string(), body: body.to_string() },
        );
    }

    /// Make one path fail at the transport level.
    pub(crate) fn fail(&self, path: &str) {
        self.routes.lock().unwrap().insert(url(path).to_string(), Route::Fail);
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self, path: &str) -> usize {
        self.calls_absolute(url(path).as_str())
    }

    pub(crate) fn calls_absolute(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    /// Park every fetch started from now on until `release`.
    pub(crate) fn hold(&self) {
        *self.gate.lock().unwrap() = Some(Arc::new(Notify::new()));
    }

    /// Let one parked fetch continue and stop parking new ones.
    pub(crate) fn release(&self) {
        if let Some(gate) = self.gate.lock().unwrap().take() {
            gate.notify_one();
        }
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<FetchResponse, Error> {
        let key = request.url.to_string();
        *self.calls.lock().unwrap().entry(key.clone()).or_default() += 1;

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("{key}: offline")));
        }

        let route = self.routes.lock().unwrap().get(&key).cloned();
        let mut response = match route {
            Some(Route::Respond { status, content_type, body }) => response(&request.url, status, &content_type, &body),
            Some(Route::Fail) => return Err(Error::Network(format!("{key}: connection reset"))),
            None => response(&request.url, 404, "text/plain", "not found"),
        };

        if request.url.origin() != url("/").origin() && request.mode == RequestMode::NoCors {
            response.kind = ResponseKind::Opaque;
        } else if request.url.origin() != url("/").origin() {
            response.kind = ResponseKind::Cors;
        }

        Ok(response)
    }
}

/// Wraps a real store and fails reads or writes on demand.
pub(crate) struct FaultyStorage {
    inner: Arc<CacheDb>,
    fail_reads: bool,
    fail_writes: bool,
}

impl FaultyStorage {
    pub(crate) fn failing_reads(inner: Arc<CacheDb>) -> Self {
        Self { inner, fail_reads: true, fail_writes: false }
    }

    pub(crate) fn failing_writes(inner: Arc<CacheDb>) -> Self {
        Self { inner, fail_reads: false, fail_writes: true }
    }

    fn injected() -> Error {
        Error::CorruptEntry("injected storage fault".into())
    }
}

#[async_trait]
impl CacheStorage for FaultyStorage {
    async fn open_store(&self, store: &StoreName) -> Result<(), Error> {
        if self.fail_writes {
            return Err(Self::injected());
        }
        self.inner.open_store(store).await
    }

    async fn list_stores(&self) -> Result<Vec<StoreInfo>, Error> {
        self.inner.list_stores().await
    }

    async fn match_entry(&self, store: &StoreName, method: &str, url: &str) -> Result<Option<CachedResponse>, Error> {
        if self.fail_reads {
            return Err(Self::injected());
        }
        self.inner.match_entry(store, method, url).await
    }

    async fn match_in_generation(
        &self, generation: &Generation, method: &str, url: &str,
    ) -> Result<Option<CachedResponse>, Error> {
        if self.fail_reads {
            return Err(Self::injected());
        }
        self.inner.match_in_generation(generation, method, url).await
    }

    async fn put_entry(&self, store: &StoreName, entry: &CachedResponse) -> Result<(), Error> {
        if self.fail_writes {
            return Err(Self::injected());
        }
        self.inner.put_entry(store, entry).await
    }

    async fn register_generation(&self, generation: &Generation) -> Result<(), Error> {
        self.inner.register_generation(generation).await
    }

    async fn set_generation_state(&self, generation: &Generation, state: GenerationState) -> Result<(), Error> {
        self.inner.set_generation_state(generation, state).await
    }

    async fn active_generation(&self, namespace: &str) -> Result<Option<Generation>, Error> {
        self.inner.active_generation(namespace).await
    }

    async fn promote_generation(&self, generation: &Generation) -> Result<Option<Generation>, Error> {
        self.inner.promote_generation(generation).await
    }

    async fn prune_superseded(&self, current: &Generation) -> Result<Vec<String>, Error> {
        self.inner.prune_superseded(current).await
    }
}
