//! Core types and shared functionality for swcache.
//!
//! This crate provides:
//! - Versioned cache store with SQLite backend
//! - Generation registry used by the lifecycle controller
//! - Unified error types
//! - Configuration structures and the built-in precache manifest

pub mod cache;
pub mod config;
pub mod error;
pub mod manifest;

pub use cache::{CacheDb, CacheStorage, CachedResponse, Generation, GenerationState, StoreInfo, StoreName, StorePurpose};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use manifest::PrecacheManifest;
