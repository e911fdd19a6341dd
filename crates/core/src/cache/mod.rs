//! SQLite-backed, versioned cache stores.
//!
//! This module provides the persistent request→response stores used by the
//! policy executors, using SQLite with async access via tokio-rusqlite. It
//! supports:
//!
//! - Named stores scoped to one generation and one purpose
//! - Request identity keys derived with SHA-256
//! - A generation registry with an atomic "current" pointer
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod generation;
pub mod generations;
pub mod hash;
pub mod migrations;
pub mod storage;
pub mod stores;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::CachedResponse;
pub use generation::{Generation, GenerationState, StoreName, StorePurpose};
pub use storage::CacheStorage;
pub use stores::StoreInfo;
