//! Page sessions seen by the controller.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use schemars::JsonSchema;
use serde::Serialize;

/// One open page session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct ClientInfo {
    pub id: String,
    /// Whether requests from this session are served by the active generation.
    pub controlled: bool,
    pub first_seen: String,
}

/// Sessions tracked at most; pages that never report closing are evicted past this.
pub(crate) const MAX_SESSIONS: usize = 1024;

#[derive(Debug)]
struct Session {
    info: ClientInfo,
    /// Observation tick of the latest request, for eviction order.
    last_seen: u64,
}

#[derive(Debug, Default)]
struct Registry {
    sessions: HashMap<String, Session>,
    tick: u64,
}

impl Registry {
    /// Drop the least recently seen session, preferring uncontrolled ones.
    fn evict_one(&mut self) {
        let victim = self
            .sessions
            .values()
            .min_by_key(|session| (session.info.controlled, session.last_seen))
            .map(|session| session.info.id.clone());

        if let Some(id) = victim {
            tracing::debug!(client = %id, "evicting idle page session");
            self.sessions.remove(&id);
        }
    }
}

/// Registry of open page sessions.
///
/// A session opened before activation stays uncontrolled until it navigates
/// or is claimed.
#[derive(Debug)]
pub(crate) struct Clients {
    registry: RwLock<Registry>,
    capacity: usize,
}

impl Default for Clients {
    fn default() -> Self {
        Self::with_capacity(MAX_SESSIONS)
    }
}

impl Clients {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self { registry: RwLock::new(Registry::default()), capacity: capacity.max(1) }
    }

    /// Record a request from a session, returning whether it is controlled.
    pub(crate) fn observe(&self, id: &str) -> bool {
        let mut registry = self.registry.write().unwrap_or_else(PoisonError::into_inner);
        registry.tick += 1;
        let tick = registry.tick;

        if let Some(session) = registry.sessions.get_mut(id) {
            session.last_seen = tick;
            return session.info.controlled;
        }

        if registry.sessions.len() >= self.capacity {
            registry.evict_one();
        }

        tracing::debug!(client = id, "new page session");
        let info = ClientInfo { id: id.to_string(), controlled: false, first_seen: chrono::Utc::now().to_rfc3339() };
        registry.sessions.insert(id.to_string(), Session { info, last_seen: tick });
        false
    }

    pub(crate) fn control(&self, id: &str) {
        let mut registry = self.registry.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(session) = registry.sessions.get_mut(id) {
            session.info.controlled = true;
        }
    }

    pub(crate) fn is_controlled(&self, id: &str) -> bool {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .sessions
            .get(id)
            .is_some_and(|session| session.info.controlled)
    }

    /// Take control of every open session. Returns the ids newly claimed.
    pub(crate) fn claim(&self) -> Vec<String> {
        let mut registry = self.registry.write().unwrap_or_else(PoisonError::into_inner);
        let mut claimed: Vec<String> = registry
            .sessions
            .values_mut()
            .filter(|session| !session.info.controlled)
            .map(|session| {
                session.info.controlled = true;
                session.info.id.clone()
            })
            .collect();
        claimed.sort();
        claimed
    }

    pub(crate) fn close(&self, id: &str) -> bool {
        self.registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .sessions
            .remove(id)
            .is_some()
    }

    pub(crate) fn open_count(&self) -> usize {
        self.registry.read().unwrap_or_else(PoisonError::into_inner).sessions.len()
    }

    pub(crate) fn snapshot(&self) -> Vec<ClientInfo> {
        let mut all: Vec<ClientInfo> = self
            .registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .sessions
            .values()
            .map(|session| session.info.clone())
            .collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }
}
