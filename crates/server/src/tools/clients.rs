//! sw_client_closed tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::CacheController;

use super::json_result;
use crate::error::ToolError;

/// Input parameters for sw_client_closed tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientClosedParams {
    /// The page session that went away.
    pub client_id: String,
}

/// Output structure for sw_client_closed tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientClosedOutput {
    /// Whether the session was known.
    pub closed: bool,
    pub open_sessions: usize,
}

/// Implementation of the sw_client_closed tool.
pub async fn client_closed_impl(
    controller: &CacheController, params: ClientClosedParams,
) -> Result<CallToolResult, McpError> {
    let id = params.client_id.trim();
    if id.is_empty() {
        return Err(ToolError::InvalidInput("client_id cannot be empty".into()).into());
    }

    let closed = controller.close_client(id);
    let output = ClientClosedOutput { closed, open_sessions: controller.clients().len() };

    json_result(&output)
}
