//! sw_message tool implementation.
//!
//! Delivers a page's control message (`skipWaiting`, `cacheAssets`) to the
//! controller.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::{CacheController, ClientMessage};

use super::json_result;
use crate::error::ToolError;

/// Input parameters for sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageParams {
    /// `"skipWaiting"` or `{"cacheAssets": ["/path.css", ...]}`.
    pub message: serde_json::Value,
}

/// Implementation of the sw_message tool.
pub async fn message_impl(controller: &CacheController, params: SwMessageParams) -> Result<CallToolResult, McpError> {
    let message = ClientMessage::from_value(params.message).map_err(|e| ToolError::InvalidMessage(e.to_string()))?;

    tracing::debug!(message = ?message, "page message");
    let outcome = controller.handle_message(message).await?;

    json_result(&outcome)
}
