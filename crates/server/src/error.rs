//! Tool-level errors for the mcp-swcache server.
//!
//! Raised while validating tool parameters, before anything reaches the
//! controller.

use rmcp::model::{ErrorCode, ErrorData as McpError};

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Invalid input parameters (e.g., empty URL, unknown method).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// A message the controller does not understand.
    #[error("INVALID_MESSAGE: {0}")]
    InvalidMessage(String),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let (code, message) = match &err {
            ToolError::InvalidInput(msg) => (-32602, msg.clone()),
            ToolError::InvalidMessage(msg) => (-32602, format!("unsupported message: {msg}")),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
