//! Strategy selection.
//!
//! Classification is a total, deterministic function of method and URL:
//! anything not matched by a more specific rule is treated as html and so
//! always revalidates with the network first.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::Method;
use schemars::JsonSchema;
use serde::Serialize;
use url::Url;

use super::{PolicyConfig, RequestClass};
use crate::request::InterceptedRequest;

static IMAGE_EXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(jpg|jpeg|png|gif|webp|svg|ico)$").expect("image pattern compiles"));

static SCRIPT_STYLE_EXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(css|js)$").expect("script/style pattern compiles"));

static FONT_EXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(woff2?|ttf|otf|eot)$").expect("font pattern compiles"));

/// Why a request was left to default network handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum PassthroughReason {
    NonGet,
    CrossOrigin,
    /// No generation is active yet.
    NotActive,
    /// The page session predates activation and has not been claimed.
    Uncontrolled,
}

/// Outcome of classifying one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Passthrough(PassthroughReason),
    Intercept(PolicyConfig),
}

/// Classifies requests for one site origin.
#[derive(Debug, Clone)]
pub struct StrategySelector {
    origin: Url,
    allowed_hosts: Vec<String>,
}

impl StrategySelector {
    pub fn new<I, S>(origin: Url, allowed_hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let allowed_hosts = allowed_hosts
            .into_iter()
            .map(|h| h.into().trim().to_ascii_lowercase())
            .collect();
        Self { origin, allowed_hosts }
    }

    pub fn classify(&self, request: &InterceptedRequest) -> Decision {
        if request.method != Method::GET {
            return Decision::Passthrough(PassthroughReason::NonGet);
        }

        if !self.is_interceptable_origin(&request.url) {
            return Decision::Passthrough(PassthroughReason::CrossOrigin);
        }

        Decision::Intercept(Self::classify_path(request.url.path()).policy())
    }

    /// Class of a URL path, ignoring origin and method.
    pub fn classify_path(path: &str) -> RequestClass {
        let path = path.to_ascii_lowercase();

        if path.ends_with(".html") || path == "/" || path.is_empty() {
            return RequestClass::Html;
        }

        if IMAGE_EXT.is_match(&path) {
            return RequestClass::Images;
        }

        if SCRIPT_STYLE_EXT.is_match(&path) || FONT_EXT.is_match(&path) {
            return RequestClass::Static;
        }

        if path.contains("/api/") || path.ends_with(".json") {
            return RequestClass::Api;
        }

        RequestClass::Html
    }

    fn is_interceptable_origin(&self, url: &Url) -> bool {
        if url.origin() == self.origin.origin() {
            return true;
        }

        url.host_str()
            .map(|host| self.allowed_hosts.iter().any(|allowed| allowed.eq_ignore_ascii_case(host)))
            .unwrap_or(false)
    }
}
