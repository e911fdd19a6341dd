//! sw_status tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use swcache_client::CacheController;

use crate::tools::json_result;

/// Implementation of the sw_status tool.
pub async fn status_impl(controller: &CacheController) -> Result<CallToolResult, McpError> {
    let status = controller.status().await?;
    json_result(&status)
}
