//! sw_install tool implementation.
//!
//! Precaches the manifest into the static store. With skip-waiting in effect
//! the generation is activated right after; otherwise it waits for sw_activate
//! or a `skipWaiting` message.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use swcache_client::CacheController;

use crate::tools::json_result;

/// Implementation of the sw_install tool.
pub async fn install_impl(controller: &CacheController) -> Result<CallToolResult, McpError> {
    let outcome = controller.install_and_activate().await?;
    json_result(&outcome)
}
