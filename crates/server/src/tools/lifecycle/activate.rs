//! sw_activate tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use swcache_client::CacheController;

use crate::tools::json_result;

/// Implementation of the sw_activate tool.
///
/// Fails with a waiting error while an older generation still has open
/// sessions and skip-waiting was not requested.
pub async fn activate_impl(controller: &CacheController) -> Result<CallToolResult, McpError> {
    let report = controller.activate().await?;
    json_result(&report)
}
