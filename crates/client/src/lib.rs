//! Client code for swcache.
//!
//! This crate provides the request-interception layer: the HTTP fetch
//! pipeline, the strategy selector, the three caching policies, and the
//! lifecycle controller that ties them to a generation of cache stores.

pub mod fetch;
pub mod lifecycle;
pub mod request;
pub mod response;
pub mod strategy;

#[cfg(test)]
pub(crate) mod testing;

pub use fetch::{FetchClient, FetchConfig, FetchResponse, Fetcher, ResponseKind};
pub use lifecycle::{
    ActivateReport, CacheController, ClientInfo, ClientMessage, ControllerSettings, ControllerStatus, FetchOutcome,
    InstallOutcome, InstallReport, MessageOutcome, PrecacheFailure,
};
pub use request::{InterceptedRequest, RequestMode};
pub use reqwest::Method;
pub use response::{ResponseSource, ServedResponse};
pub use strategy::{Decision, PassthroughReason, PolicyConfig, PolicyExecutor, RequestClass, StrategyKind, StrategySelector};
