//! Responses handed back to the page.

use std::borrow::Cow;

use bytes::Bytes;
use schemars::JsonSchema;
use serde::Serialize;
use swcache_core::CachedResponse;

use crate::fetch::FetchResponse;

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseSource {
    Network,
    Cache,
    NavigationFallback,
    /// Synthetic 503.
    Offline,
}

/// A concrete response for an intercepted request.
#[derive(Debug, Clone)]
pub struct ServedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub source: ResponseSource,
}

impl ServedResponse {
    /// The only status code this layer manufactures.
    pub const OFFLINE_STATUS: u16 = 503;

    pub fn from_network(response: FetchResponse) -> Self {
        Self {
            status: response.status.as_u16(),
            headers: response.header_pairs(),
            body: response.bytes,
            source: ResponseSource::Network,
        }
    }

    pub fn from_cache(entry: CachedResponse) -> Self {
        Self::from_entry(entry, ResponseSource::Cache)
    }

    pub fn navigation_fallback(entry: CachedResponse) -> Self {
        Self::from_entry(entry, ResponseSource::NavigationFallback)
    }

    fn from_entry(entry: CachedResponse, source: ResponseSource) -> Self {
        Self { status: entry.status, headers: entry.headers, body: Bytes::from(entry.body), source }
    }

    /// Synthetic 503 with a plain-text explanation.
    pub fn offline(message: &str) -> Self {
        Self {
            status: Self::OFFLINE_STATUS,
            headers: vec![("content-type".to_string(), "text/plain".to_string())],
            body: Bytes::copy_from_slice(message.as_bytes()),
            source: ResponseSource::Offline,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}
