//! HTTP fetch pipeline used by the policy executors.
//!
//! ### URL Canonicalization
//! - Trim whitespace, require an http(s) scheme
//! - Lowercase host, remove fragments
//! - Preserve query string
//! - Root-relative manifest entries resolve against the site origin
//!
//! ### Limits
//! - Request timeout: configurable (default 20s), no custom timer on top
//! - Max redirects: 5
//! - Max body bytes: 5MB (configurable)
//!
//! Unlike a plain download helper, a non-2xx status is *not* an error here:
//! the response still goes back to the page, the executors simply refuse to
//! store it.

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Url;
use reqwest::{Client, StatusCode, header};
use std::time::{Duration, Instant};

pub use url::{UrlError, canonicalize, resolve};

use swcache_core::{AppConfig, CachedResponse, Error};

use crate::request::{InterceptedRequest, RequestMode};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "swcache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,

    /// Site origin, used to tell same-origin from cross-origin responses.
    pub origin: Url,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "swcache/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
            origin: Url::parse("http://localhost:8080").expect("static origin parses"),
        }
    }
}

impl FetchConfig {
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = canonicalize(&config.origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            origin,
            ..Default::default()
        })
    }
}

/// How much of a response the page is allowed to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// Same-origin response.
    Basic,
    /// Cross-origin response fetched in CORS mode.
    Cors,
    /// Cross-origin `no-cors` response; never stored.
    Opaque,
}

/// Response from a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The URL requested; entries are stored under it even after redirects
    pub url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Response body bytes
    pub bytes: Bytes,
    /// Response headers
    pub headers: header::HeaderMap,
    pub kind: ResponseKind,
}

impl FetchResponse {
    pub fn is_ok(&self) -> bool {
        self.status.is_success()
    }

    /// Only successful, non-opaque responses may be written to a store.
    pub fn is_cacheable(&self) -> bool {
        self.is_ok() && self.kind != ResponseKind::Opaque
    }

    /// Header pairs with valid UTF-8 values, in wire order.
    pub fn header_pairs(&self) -> Vec<(String, String)> {
        self.headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect()
    }

    /// Snapshot this response for storage under the requested URL.
    pub fn to_cached(&self, method: &str) -> CachedResponse {
        CachedResponse::new(method, self.url.as_str(), self.status.as_u16(), self.header_pairs(), self.bytes.to_vec())
    }
}

/// The network capability.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Send the request. `Err` means no response arrived at all.
    async fn fetch(&self, request: &InterceptedRequest) -> Result<FetchResponse, Error>;
}

/// HTTP fetch client backed by reqwest.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    fn kind_for(&self, request: &InterceptedRequest) -> ResponseKind {
        if request.url.origin() == self.config.origin.origin() {
            ResponseKind::Basic
        } else if request.mode == RequestMode::NoCors {
            ResponseKind::Opaque
        } else {
            ResponseKind::Cors
        }
    }
}

fn network_error(url: &Url, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::FetchTimeout(format!("{url}: {err}"))
    } else {
        Error::Network(format!("{url}: {err}"))
    }
}

#[async_trait]
impl Fetcher for FetchClient {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<FetchResponse, Error> {
        let start = Instant::now();
        let url = request.url.clone();

        let response = self
            .http
            .request(request.method.clone(), url.as_str())
            .send()
            .await
            .map_err(|e| network_error(&url, e))?;

        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!(
                "{} bytes exceeds {}",
                len, self.config.max_bytes
            )));
        }

        let final_url = response.url().clone();
        let headers = response.headers().clone();

        let bytes = response.bytes().await.map_err(|e| network_error(&url, e))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!(
                "{} bytes exceeds {}",
                bytes.len(),
                self.config.max_bytes
            )));
        }

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} {} -> {} ({}) in {}ms ({} bytes)",
            request.method,
            url,
            final_url,
            status.as_u16(),
            fetch_ms,
            bytes.len()
        );

        Ok(FetchResponse { url, status, bytes, headers, kind: self.kind_for(request) })
    }
}
