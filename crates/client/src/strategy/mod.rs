//! Request classification and caching policies.
//!
//! | class  | strategy               | store   |
//! |--------|------------------------|---------|
//! | html   | network-first          | dynamic |
//! | static | stale-while-revalidate | static  |
//! | images | cache-first            | images  |
//! | api    | network-first          | dynamic |

mod cache_first;
mod executor;
mod network_first;
pub mod selector;
mod stale_while_revalidate;

use std::fmt;

use schemars::JsonSchema;
use serde::Serialize;
use swcache_core::StorePurpose;

pub use executor::PolicyExecutor;
pub use selector::{Decision, PassthroughReason, StrategySelector};

/// Request class assigned by the selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RequestClass {
    Html,
    Static,
    Images,
    Api,
}

impl RequestClass {
    /// The configured policy for this class.
    pub const fn policy(self) -> PolicyConfig {
        let (strategy, store) = match self {
            Self::Html => (StrategyKind::NetworkFirst, StorePurpose::Dynamic),
            Self::Static => (StrategyKind::StaleWhileRevalidate, StorePurpose::Static),
            Self::Images => (StrategyKind::CacheFirst, StorePurpose::Images),
            Self::Api => (StrategyKind::NetworkFirst, StorePurpose::Dynamic),
        };
        PolicyConfig { class: self, strategy, store }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Static => "static",
            Self::Images => "images",
            Self::Api => "api",
        }
    }
}

impl fmt::Display for RequestClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    CacheFirst,
    NetworkFirst,
    StaleWhileRevalidate,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CacheFirst => "cache-first",
            Self::NetworkFirst => "network-first",
            Self::StaleWhileRevalidate => "stale-while-revalidate",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strategy and target store for one request class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
pub struct PolicyConfig {
    pub class: RequestClass,
    pub strategy: StrategyKind,
    pub store: StorePurpose,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_table() {
        assert_eq!(RequestClass::Html.policy().strategy, StrategyKind::NetworkFirst);
        assert_eq!(RequestClass::Html.policy().store, StorePurpose::Dynamic);
        assert_eq!(RequestClass::Static.policy().strategy, StrategyKind::StaleWhileRevalidate);
        assert_eq!(RequestClass::Static.policy().store, StorePurpose::Static);
        assert_eq!(RequestClass::Images.policy().strategy, StrategyKind::CacheFirst);
        assert_eq!(RequestClass::Images.policy().store, StorePurpose::Images);
        assert_eq!(RequestClass::Api.policy().strategy, StrategyKind::NetworkFirst);
        assert_eq!(RequestClass::Api.policy().store, StorePurpose::Dynamic);
    }

    #[test]
    fn test_policy_serialization() {
        let json = serde_json::to_value(RequestClass::Static.policy()).unwrap();
        assert_eq!(json["class"], "static");
        assert_eq!(json["strategy"], "stale-while-revalidate");
        assert_eq!(json["store"], "static");
    }
}
