//! Control messages sent by pages.
//!
//! Accepted shapes:
//! - `"skipWaiting"` (or `{"type": "SKIP_WAITING"}`)
//! - `{"cacheAssets": ["/a.css", ...]}` (or `{"type": "CACHE_ASSETS", "assets": [...]}`)

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::Error;

use super::ActivateReport;

/// A control message from a page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "WireMessage")]
pub enum ClientMessage {
    /// Promote a waiting generation now.
    SkipWaiting,
    /// Insert extra URLs into the static store, all or nothing.
    CacheAssets(Vec<String>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireMessage {
    Keyword(String),
    CacheAssets {
        #[serde(rename = "cacheAssets")]
        cache_assets: Vec<String>,
    },
    Typed {
        #[serde(rename = "type")]
        kind: String,
        #[serde(default)]
        assets: Vec<String>,
    },
}

impl TryFrom<WireMessage> for ClientMessage {
    type Error = Error;

    fn try_from(wire: WireMessage) -> Result<Self, Self::Error> {
        match wire {
            WireMessage::Keyword(keyword) => match keyword.as_str() {
                "skipWaiting" => Ok(Self::SkipWaiting),
                other => Err(Error::InvalidInput(format!("unknown message: {other}"))),
            },
            WireMessage::CacheAssets { cache_assets } => Ok(Self::CacheAssets(cache_assets)),
            WireMessage::Typed { kind, assets } => match kind.as_str() {
                "SKIP_WAITING" | "skipWaiting" => Ok(Self::SkipWaiting),
                "CACHE_ASSETS" | "cacheAssets" => Ok(Self::CacheAssets(assets)),
                other => Err(Error::InvalidInput(format!("unknown message type: {other}"))),
            },
        }
    }
}

impl ClientMessage {
    pub fn from_value(value: serde_json::Value) -> Result<Self, Error> {
        serde_json::from_value(value).map_err(|e| Error::InvalidInput(e.to_string()))
    }
}

/// What handling a message did.
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum MessageOutcome {
    SkipWaitingRequested {
        /// Present when a waiting generation was promoted by this message.
        activated: Option<ActivateReport>,
    },
    AssetsCached {
        urls: Vec<String>,
    },
}
