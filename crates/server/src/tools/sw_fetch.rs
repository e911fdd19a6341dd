//! sw_fetch tool implementation.
//!
//! Hands one page request to the controller. A request that is not
//! intercepted comes back as `intercepted: false`; the caller then performs
//! its default network handling itself.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::fetch::resolve;
use swcache_client::{
    CacheController, FetchOutcome, InterceptedRequest, Method, PassthroughReason, PolicyConfig, RequestMode,
    ResponseSource, ServedResponse,
};
use url::Url;

use super::json_result;
use crate::error::ToolError;

/// Input parameters for sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Request URL, absolute or root-relative to the site origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default)]
    pub method: Option<String>,

    /// Request mode: "navigate", "same-origin", "no-cors" (default) or "cors".
    #[serde(default)]
    pub mode: Option<String>,

    /// Page session issuing the request.
    #[serde(default)]
    pub client_id: Option<String>,
}

/// Output structure for sw_fetch tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SwFetchOutput {
    pub intercepted: bool,
    /// Why the request was left alone (only when not intercepted).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passthrough: Option<PassthroughReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<PolicyConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ResponseSource>,
    pub headers: Vec<(String, String)>,
    /// Body as text, when it is valid UTF-8.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Body as standard base64, when it is not valid UTF-8 (images, fonts).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_base64: Option<String>,
    pub body_bytes: usize,
}

impl SwFetchOutput {
    fn passthrough(reason: PassthroughReason) -> Self {
        Self {
            intercepted: false,
            passthrough: Some(reason),
            policy: None,
            status: None,
            source: None,
            headers: Vec::new(),
            body: None,
            body_base64: None,
            body_bytes: 0,
        }
    }

    fn served(policy: PolicyConfig, response: ServedResponse) -> Self {
        let (body, body_base64) = match std::str::from_utf8(&response.body) {
            Ok(text) => (Some(text.to_string()), None),
            Err(_) => (None, Some(STANDARD.encode(&response.body))),
        };
        let body_bytes = response.body.len();
        Self {
            intercepted: true,
            passthrough: None,
            policy: Some(policy),
            status: Some(response.status),
            source: Some(response.source),
            headers: response.headers,
            body,
            body_base64,
            body_bytes,
        }
    }
}

fn build_request(origin: &Url, params: SwFetchParams) -> Result<InterceptedRequest, McpError> {
    if params.url.trim().is_empty() {
        return Err(ToolError::InvalidInput("url cannot be empty".into()).into());
    }

    let url = resolve(origin, &params.url).map_err(|e| ToolError::InvalidInput(e.to_string()))?;

    let method = match params.method.as_deref().map(str::trim) {
        None | Some("") => Method::GET,
        Some(method) => Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .map_err(|e| ToolError::InvalidInput(format!("invalid method {method}: {e}")))?,
    };

    let mode = match params.mode.as_deref() {
        Some(mode) => mode.parse::<RequestMode>()?,
        None => RequestMode::default(),
    };

    let request = InterceptedRequest::new(method, url, mode);
    Ok(match params.client_id {
        Some(id) if !id.trim().is_empty() => request.with_client(id),
        _ => request,
    })
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(controller: &CacheController, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    let request = build_request(&controller.settings().origin, params)?;

    let output = match controller.handle_fetch(&request).await {
        FetchOutcome::Passthrough(reason) => SwFetchOutput::passthrough(reason),
        FetchOutcome::Served { policy, response } => SwFetchOutput::served(policy, response),
    };

    json_result(&output)
}
