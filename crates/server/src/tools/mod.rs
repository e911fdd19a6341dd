//! MCP tool implementations.
//!
//! Each tool stands in for one platform event or channel of the worker:
//! install, activate, fetch interception, page messages and session teardown.

pub mod clients;
pub mod lifecycle;
pub mod sw_fetch;
pub mod sw_message;

#[cfg(test)]
pub(crate) mod testing;

pub use clients::{ClientClosedParams, client_closed_impl};
pub use lifecycle::{activate_impl, install_impl, status_impl};
pub use sw_fetch::{SwFetchParams, fetch_impl};
pub use sw_message::{SwMessageParams, message_impl};

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;
use swcache_core::Error;

/// Render a tool output as pretty-printed JSON text.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
