//! Generation lifecycle.
//!
//! A [`CacheController`] owns one generation and walks it through
//! `parsed → installing → installed → activating → active`, with `redundant`
//! for an aborted install and `superseded` once a newer generation wins.
//!
//! Activation order is fixed: swap the active pointer, delete the other
//! generations' stores, then claim open sessions. A request that started
//! against a retired generation may still finish; its writes are rejected by
//! the store and dropped by the executor.

mod clients;
mod messages;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use reqwest::Method;
use schemars::JsonSchema;
use serde::Serialize;
use swcache_core::{
    AppConfig, CacheStorage, Error, Generation, GenerationState, PrecacheManifest, StoreInfo, StoreName, StorePurpose,
};
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use url::Url;

pub use clients::ClientInfo;
pub use messages::{ClientMessage, MessageOutcome};

use crate::fetch::{FetchResponse, Fetcher, canonicalize, resolve};
use crate::request::{InterceptedRequest, RequestMode};
use crate::response::ServedResponse;
use crate::strategy::{Decision, PassthroughReason, PolicyConfig, PolicyExecutor, StrategySelector};
use clients::Clients;

/// Immutable settings for one controller, built once at start.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub generation: Generation,
    pub origin: Url,
    pub allowed_hosts: Vec<String>,
    pub navigation_fallback: Url,
    /// Promote right after install instead of waiting for old sessions to close.
    pub skip_waiting: bool,
    pub precache_concurrency: usize,
}

impl ControllerSettings {
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = canonicalize(&config.origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let navigation_fallback =
            resolve(&origin, &config.navigation_fallback).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        Ok(Self {
            generation: config.generation(),
            origin,
            allowed_hosts: config.allowed_hosts.clone(),
            navigation_fallback,
            skip_waiting: config.skip_waiting,
            precache_concurrency: config.precache_concurrency,
        })
    }
}

/// A manifest URL that could not be precached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct PrecacheFailure {
    pub url: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct InstallReport {
    pub generation: String,
    /// Manifest URLs now in the static store, in manifest order.
    pub cached: Vec<String>,
    pub failed: Vec<PrecacheFailure>,
    pub skip_waiting: bool,
}

/// An install plus the activation that skip-waiting triggers after it.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct InstallOutcome {
    #[serde(flatten)]
    pub report: InstallReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activated: Option<ActivateReport>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ActivateReport {
    pub generation: String,
    /// The generation that was active before, now superseded.
    pub previous: Option<String>,
    pub deleted_stores: Vec<String>,
    /// Sessions taken over by this activation.
    pub claimed: Vec<String>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ControllerStatus {
    pub generation: String,
    pub state: GenerationState,
    pub skip_waiting: bool,
    /// Active generation of this namespace according to the store registry.
    pub active_generation: Option<String>,
    pub stores: Vec<StoreInfo>,
    pub clients: Vec<ClientInfo>,
    pub pending_revalidations: usize,
}

/// Result of handing one request to the controller.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// Not intercepted; default network handling applies.
    Passthrough(PassthroughReason),
    Served { policy: PolicyConfig, response: ServedResponse },
}

/// Lifecycle controller for one generation.
pub struct CacheController {
    settings: ControllerSettings,
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    selector: StrategySelector,
    executor: PolicyExecutor,
    manifest: PrecacheManifest,
    state: RwLock<GenerationState>,
    skip_waiting: AtomicBool,
    clients: Clients,
    /// Executor of the generation still in service while this one waits.
    previous: std::sync::Mutex<Option<Arc<PolicyExecutor>>>,
    /// Serializes install and activate.
    transition: Mutex<()>,
}

impl CacheController {
    pub fn new(settings: ControllerSettings, storage: Arc<dyn CacheStorage>, fetcher: Arc<dyn Fetcher>) -> Self {
        let selector = StrategySelector::new(settings.origin.clone(), settings.allowed_hosts.iter().cloned());
        let executor = PolicyExecutor::new(
            Arc::clone(&storage),
            Arc::clone(&fetcher),
            settings.generation.clone(),
            settings.navigation_fallback.clone(),
        );

        Self {
            settings,
            storage,
            fetcher,
            selector,
            executor,
            manifest: PrecacheManifest::default(),
            state: RwLock::new(GenerationState::Parsed),
            skip_waiting: AtomicBool::new(false),
            clients: Clients::default(),
            previous: std::sync::Mutex::new(None),
            transition: Mutex::new(()),
        }
    }

    /// Replace the built-in precache manifest.
    pub fn with_manifest(mut self, manifest: PrecacheManifest) -> Self {
        self.manifest = manifest;
        self
    }

    pub fn generation(&self) -> &Generation {
        &self.settings.generation
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    pub fn state(&self) -> GenerationState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, next: GenerationState) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let previous = *state;
        tracing::info!(generation = %self.settings.generation, from = %previous, to = %next, "lifecycle transition");
        *state = next;
    }

    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    /// Open the static store and precache the manifest.
    ///
    /// Per-URL failures are recorded in the report; only failing to register
    /// the generation or open its static store aborts the install.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        let _transition = self.transition.lock().await;

        let current = self.state();
        if !matches!(current, GenerationState::Parsed | GenerationState::Redundant) {
            return Err(Error::Lifecycle(format!(
                "cannot install {} from state {current}",
                self.settings.generation
            )));
        }

        self.set_state(GenerationState::Installing);
        let static_store = self.settings.generation.store(StorePurpose::Static);

        if let Err(e) = self.open_static_store(&static_store).await {
            tracing::error!(generation = %self.settings.generation, error = %e, "install aborted");
            self.abort_install().await;
            return Err(e);
        }

        tracing::info!(store = %static_store, assets = self.manifest.len(), "precaching");
        let (cached, failed) = self.precache(&static_store).await;

        if let Err(e) = self
            .storage
            .set_generation_state(&self.settings.generation, GenerationState::Installed)
            .await
        {
            tracing::error!(generation = %self.settings.generation, error = %e, "install aborted");
            self.abort_install().await;
            return Err(e);
        }
        self.set_state(GenerationState::Installed);

        if self.settings.skip_waiting {
            self.skip_waiting.store(true, Ordering::SeqCst);
        }

        tracing::info!(
            generation = %self.settings.generation,
            cached = cached.len(),
            failed = failed.len(),
            "precache complete"
        );

        Ok(InstallReport {
            generation: self.settings.generation.id(),
            cached,
            failed,
            skip_waiting: self.skip_waiting_requested(),
        })
    }

    /// Install, then activate right away when skip-waiting is in effect.
    ///
    /// Without skip-waiting the generation stays installed until
    /// [`CacheController::activate`] or a `skipWaiting` message.
    pub async fn install_and_activate(&self) -> Result<InstallOutcome, Error> {
        let report = self.install().await?;
        let activated = if report.skip_waiting { Some(self.activate().await?) } else { None };
        Ok(InstallOutcome { report, activated })
    }

    async fn open_static_store(&self, store: &StoreName) -> Result<(), Error> {
        self.storage.register_generation(&self.settings.generation).await?;
        self.storage.open_store(store).await
    }

    async fn abort_install(&self) {
        self.set_state(GenerationState::Redundant);
        if let Err(e) = self
            .storage
            .set_generation_state(&self.settings.generation, GenerationState::Redundant)
            .await
        {
            tracing::warn!(generation = %self.settings.generation, error = %e, "failed to record redundant generation");
        }
    }

    async fn precache(&self, store: &StoreName) -> (Vec<String>, Vec<PrecacheFailure>) {
        let mut cached = Vec::new();
        let mut failed = Vec::new();

        let fetched = match self.fetch_all(self.manifest.urls()).await {
            Ok(fetched) => fetched,
            Err(e) => {
                let reason = e.to_string();
                let failed = self
                    .manifest
                    .urls()
                    .iter()
                    .map(|url| PrecacheFailure { url: url.clone(), reason: reason.clone() })
                    .collect();
                return (cached, failed);
            }
        };

        for (url, outcome) in fetched {
            let written = match outcome {
                Ok(response) => self.storage.put_entry(store, &response.to_cached("GET")).await,
                Err(e) => Err(e),
            };

            match written {
                Ok(()) => cached.push(url),
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "failed to cache");
                    failed.push(PrecacheFailure { url, reason: e.to_string() });
                }
            }
        }

        (cached, failed)
    }

    /// Fetch every URL with bounded concurrency. Results keep input order.
    ///
    /// Anything but a storable success counts as a failure for that URL.
    async fn fetch_all(&self, urls: &[String]) -> Result<Vec<(String, Result<FetchResponse, Error>)>, Error> {
        let semaphore = Arc::new(Semaphore::new(self.settings.precache_concurrency.max(1)));
        let mut join_set = JoinSet::new();
        let mut results: Vec<Option<Result<FetchResponse, Error>>> = urls.iter().map(|_| None).collect();

        for (index, raw) in urls.iter().enumerate() {
            let url = match resolve(&self.settings.origin, raw) {
                Ok(url) => url,
                Err(e) => {
                    results[index] = Some(Err(Error::InvalidUrl(format!("{raw}: {e}"))));
                    continue;
                }
            };

            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| Error::Lifecycle(e.to_string()))?;
            let fetcher = Arc::clone(&self.fetcher);

            join_set.spawn(async move {
                let _permit = permit;
                let request = InterceptedRequest::new(Method::GET, url, RequestMode::Cors);
                let outcome = fetcher.fetch(&request).await.and_then(require_storable);
                (index, outcome)
            });
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, outcome)) => results[index] = Some(outcome),
                Err(e) => tracing::warn!(error = %e, "fetch task failed"),
            }
        }

        Ok(urls
            .iter()
            .zip(results)
            .map(|(url, outcome)| {
                let outcome = outcome.unwrap_or_else(|| Err(Error::Network(format!("{url}: fetch task failed"))));
                (url.clone(), outcome)
            })
            .collect())
    }

    /// Promote this generation, prune the others, then claim open sessions.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        let _transition = self.transition.lock().await;

        let current = self.state();
        if current != GenerationState::Installed {
            return Err(Error::Lifecycle(format!(
                "cannot activate {} from state {current}",
                self.settings.generation
            )));
        }

        if !self.skip_waiting_requested() {
            let active = self.storage.active_generation(&self.settings.generation.namespace).await?;
            let open = self.clients.open_count();
            if let Some(active) = active
                && active != self.settings.generation
                && open > 0
            {
                tracing::info!(generation = %self.settings.generation, active = %active, open, "waiting");
                return Err(Error::Waiting(format!(
                    "{} waits for {open} open session(s) of {active}",
                    self.settings.generation
                )));
            }
        }

        self.set_state(GenerationState::Activating);

        match self.swap_and_prune().await {
            Ok((previous, deleted_stores)) => {
                self.set_state(GenerationState::Active);
                let claimed = self.clients.claim();
                tracing::info!(
                    generation = %self.settings.generation,
                    deleted = deleted_stores.len(),
                    claimed = claimed.len(),
                    "activation complete"
                );
                Ok(ActivateReport {
                    generation: self.settings.generation.id(),
                    previous: previous.map(|g| g.id()),
                    deleted_stores,
                    claimed,
                })
            }
            Err(e @ Error::GenerationRetired(_)) => {
                self.set_state(GenerationState::Superseded);
                Err(e)
            }
            Err(e) => {
                tracing::error!(generation = %self.settings.generation, error = %e, "activation failed");
                self.set_state(GenerationState::Installed);
                Err(e)
            }
        }
    }

    async fn swap_and_prune(&self) -> Result<(Option<Generation>, Vec<String>), Error> {
        let previous = self.storage.promote_generation(&self.settings.generation).await?;
        let deleted = self.storage.prune_superseded(&self.settings.generation).await?;
        for name in &deleted {
            tracing::info!(store = %name, "deleted old cache");
        }
        Ok((previous, deleted))
    }

    /// Decide whether a request is intercepted, and by which policy.
    pub fn intercept(&self, request: &InterceptedRequest) -> Decision {
        if let Some(id) = request.client_id.as_deref() {
            self.clients.observe(id);
        }

        if self.state() != GenerationState::Active {
            return Decision::Passthrough(PassthroughReason::NotActive);
        }

        if let Some(id) = request.client_id.as_deref() {
            if request.is_navigation() {
                self.clients.control(id);
            } else if !self.clients.is_controlled(id) {
                return Decision::Passthrough(PassthroughReason::Uncontrolled);
            }
        }

        self.selector.classify(request)
    }

    /// Serve an intercepted request with its policy.
    pub async fn respond(&self, request: &InterceptedRequest, policy: PolicyConfig) -> ServedResponse {
        self.executor.execute(request, policy).await
    }

    /// Serve a request with this generation, or with the generation still
    /// active in the registry while this one is not.
    pub async fn handle_fetch(&self, request: &InterceptedRequest) -> FetchOutcome {
        match self.intercept(request) {
            Decision::Intercept(policy) => {
                let response = self.respond(request, policy).await;
                FetchOutcome::Served { policy, response }
            }
            Decision::Passthrough(PassthroughReason::NotActive) => match self.serving_generation().await {
                Some(active) if active == self.settings.generation => self.serve_with(&self.executor, request).await,
                Some(active) => {
                    let previous = self.previous_executor(active);
                    self.serve_with(&previous, request).await
                }
                None => passthrough(request, PassthroughReason::NotActive),
            },
            Decision::Passthrough(reason) => passthrough(request, reason),
        }
    }

    async fn serve_with(&self, executor: &PolicyExecutor, request: &InterceptedRequest) -> FetchOutcome {
        match self.selector.classify(request) {
            Decision::Intercept(policy) => {
                tracing::debug!(url = %request.url, generation = %executor.generation(), "served by registry generation");
                let response = executor.execute(request, policy).await;
                FetchOutcome::Served { policy, response }
            }
            Decision::Passthrough(reason) => passthrough(request, reason),
        }
    }

    /// The namespace's active generation according to the registry.
    async fn serving_generation(&self) -> Option<Generation> {
        match self.storage.active_generation(&self.settings.generation.namespace).await {
            Ok(active) => active,
            Err(e) => {
                tracing::warn!(namespace = %self.settings.generation.namespace, error = %e, "active generation lookup failed");
                None
            }
        }
    }

    /// Executor bound to another generation still in service, built once per generation.
    fn previous_executor(&self, active: Generation) -> Arc<PolicyExecutor> {
        let mut slot = self.previous.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(executor) = slot.as_ref()
            && executor.generation() == &active
        {
            return Arc::clone(executor);
        }

        let executor = Arc::new(PolicyExecutor::new(
            Arc::clone(&self.storage),
            Arc::clone(&self.fetcher),
            active,
            self.settings.navigation_fallback.clone(),
        ));
        *slot = Some(Arc::clone(&executor));
        executor
    }

    fn previous_snapshot(&self) -> Option<Arc<PolicyExecutor>> {
        self.previous.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub async fn handle_message(&self, message: ClientMessage) -> Result<MessageOutcome, Error> {
        match message {
            ClientMessage::SkipWaiting => {
                self.skip_waiting.store(true, Ordering::SeqCst);
                let activated = if self.state() == GenerationState::Installed {
                    Some(self.activate().await?)
                } else {
                    None
                };
                Ok(MessageOutcome::SkipWaitingRequested { activated })
            }
            ClientMessage::CacheAssets(urls) => {
                let urls = self.cache_assets(&urls).await?;
                Ok(MessageOutcome::AssetsCached { urls })
            }
        }
    }

    /// Fetch every URL, then store them all. Nothing is written if any fetch fails.
    async fn cache_assets(&self, urls: &[String]) -> Result<Vec<String>, Error> {
        let fetched = self.fetch_all(urls).await?;

        let mut responses = Vec::with_capacity(fetched.len());
        for (url, outcome) in fetched {
            let response = outcome.map_err(|e| {
                tracing::warn!(url = %url, error = %e, "cacheAssets aborted");
                e
            })?;
            responses.push(response);
        }

        let store = self.settings.generation.store(StorePurpose::Static);
        let mut stored = Vec::with_capacity(responses.len());
        for response in responses {
            self.storage.put_entry(&store, &response.to_cached("GET")).await?;
            stored.push(response.url.to_string());
        }

        tracing::info!(store = %store, count = stored.len(), "cached assets on demand");
        Ok(stored)
    }

    /// Forget a closed page session.
    pub fn close_client(&self, id: &str) -> bool {
        self.clients.close(id)
    }

    pub fn clients(&self) -> Vec<ClientInfo> {
        self.clients.snapshot()
    }

    /// Wait for pending background revalidations.
    pub async fn drain_background(&self) -> usize {
        let mut drained = self.executor.drain_background().await;
        if let Some(previous) = self.previous_snapshot() {
            drained += previous.drain_background().await;
        }
        drained
    }

    pub async fn status(&self) -> Result<ControllerStatus, Error> {
        let active_generation = self
            .storage
            .active_generation(&self.settings.generation.namespace)
            .await?
            .map(|g| g.id());
        let stores = self.storage.list_stores().await?;

        Ok(ControllerStatus {
            generation: self.settings.generation.id(),
            state: self.state(),
            skip_waiting: self.skip_waiting_requested(),
            active_generation,
            stores,
            clients: self.clients.snapshot(),
            pending_revalidations: self.executor.pending_background()
                + self.previous_snapshot().map_or(0, |previous| previous.pending_background()),
        })
    }
}

fn passthrough(request: &InterceptedRequest, reason: PassthroughReason) -> FetchOutcome {
    tracing::debug!(method = %request.method, url = %request.url, reason = ?reason, "passthrough");
    FetchOutcome::Passthrough(reason)
}

fn require_storable(response: FetchResponse) -> Result<FetchResponse, Error> {
    if response.is_cacheable() {
        Ok(response)
    } else {
        Err(Error::HttpError(format!("{} returned {}", response.url, response.status)))
    }
}
