//! The cache store capability.
//!
//! Policy executors and the lifecycle controller only see this trait, so the
//! SQLite backend can be swapped or wrapped (e.g. to inject faults in tests).

use async_trait::async_trait;

use super::connection::CacheDb;
use super::entries::CachedResponse;
use super::generation::{Generation, GenerationState, StoreName};
use super::stores::StoreInfo;
use crate::Error;

/// Named, versioned request→response stores plus the generation registry.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    async fn open_store(&self, store: &StoreName) -> Result<(), Error>;

    async fn list_stores(&self) -> Result<Vec<StoreInfo>, Error>;

    async fn match_entry(&self, store: &StoreName, method: &str, url: &str) -> Result<Option<CachedResponse>, Error>;

    /// Match across all stores of a generation (like `caches.match`).
    async fn match_in_generation(
        &self, generation: &Generation, method: &str, url: &str,
    ) -> Result<Option<CachedResponse>, Error>;

    async fn put_entry(&self, store: &StoreName, entry: &CachedResponse) -> Result<(), Error>;

    async fn register_generation(&self, generation: &Generation) -> Result<(), Error>;

    async fn set_generation_state(&self, generation: &Generation, state: GenerationState) -> Result<(), Error>;

    async fn active_generation(&self, namespace: &str) -> Result<Option<Generation>, Error>;

    async fn promote_generation(&self, generation: &Generation) -> Result<Option<Generation>, Error>;

    async fn prune_superseded(&self, current: &Generation) -> Result<Vec<String>, Error>;
}

#[async_trait]
impl CacheStorage for CacheDb {
    async fn open_store(&self, store: &StoreName) -> Result<(), Error> {
        CacheDb::open_store(self, store).await
    }

    async fn list_stores(&self) -> Result<Vec<StoreInfo>, Error> {
        CacheDb::list_stores(self).await
    }

    async fn match_entry(&self, store: &StoreName, method: &str, url: &str) -> Result<Option<CachedResponse>, Error> {
        CacheDb::match_entry(self, store, method, url).await
    }

    async fn match_in_generation(
        &self, generation: &Generation, method: &str, url: &str,
    ) -> Result<Option<CachedResponse>, Error> {
        CacheDb::match_in_generation(self, generation, method, url).await
    }

    async fn put_entry(&self, store: &StoreName, entry: &CachedResponse) -> Result<(), Error> {
        CacheDb::put_entry(self, store, entry).await
    }

    async fn register_generation(&self, generation: &Generation) -> Result<(), Error> {
        CacheDb::register_generation(self, generation).await
    }

    async fn set_generation_state(&self, generation: &Generation, state: GenerationState) -> Result<(), Error> {
        CacheDb::set_generation_state(self, generation, state).await
    }

    async fn active_generation(&self, namespace: &str) -> Result<Option<Generation>, Error> {
        CacheDb::active_generation(self, namespace).await
    }

    async fn promote_generation(&self, generation: &Generation) -> Result<Option<Generation>, Error> {
        CacheDb::promote_generation(self, generation).await
    }

    async fn prune_superseded(&self, current: &Generation) -> Result<Vec<String>, Error> {
        CacheDb::prune_superseded(self, current).await
    }
}
