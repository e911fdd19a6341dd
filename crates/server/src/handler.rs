//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::{
    ClientClosedParams, SwFetchParams, SwMessageParams, activate_impl, client_closed_impl, fetch_impl, install_impl,
    message_impl, status_impl,
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use swcache_client::CacheController;

/// The main MCP server handler for mcp-swcache.
#[derive(Clone)]
pub struct SwCacheServer {
    tool_router: ToolRouter<Self>,
    controller: Arc<CacheController>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl SwCacheServer {
    /// Create a new server handler around a controller.
    pub fn new(controller: Arc<CacheController>) -> Self {
        Self { tool_router: Self::tool_router(), controller }
    }

    #[tool(description = "Install the generation: open its static store and precache the manifest. \
        Per-URL failures are reported, not fatal. Activates right after when skip-waiting is in effect.")]
    async fn sw_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.controller).await
    }

    #[tool(description = "Activate the installed generation: promote it, delete older generations' stores, \
        then claim open page sessions.")]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.controller).await
    }

    /// Intercept one page request.
    ///
    /// Returns the served response, or `intercepted: false` when default
    /// network handling applies.
    #[tool(description = "Handle a page request. Returns the response chosen by the caching policy \
        (network-first, stale-while-revalidate or cache-first), or intercepted=false.")]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.controller, params.0).await
    }

    #[tool(description = "Send a page message: \"skipWaiting\" or {\"cacheAssets\": [urls]}.")]
    async fn sw_message(&self, params: Parameters<SwMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.controller, params.0).await
    }

    #[tool(description = "Report that a page session was closed.")]
    async fn sw_client_closed(&self, params: Parameters<ClientClosedParams>) -> Result<CallToolResult, McpError> {
        client_closed_impl(&self.controller, params.0).await
    }

    #[tool(description = "Show the generation, its lifecycle state, stores with entry counts and open sessions.")]
    async fn sw_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.controller).await
    }
}

impl ServerHandler for SwCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "mcp-swcache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{self, StaticSite};

    #[tokio::test]
    async fn test_router_lists_every_tool() {
        let server = SwCacheServer::new(testing::controller(Arc::new(StaticSite::new())).await);
        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();
        assert_eq!(
            names,
            vec!["sw_activate", "sw_client_closed", "sw_fetch", "sw_install", "sw_message", "sw_status"]
        );
    }

    #[tokio::test]
    async fn test_server_info() {
        let server = SwCacheServer::new(testing::controller(Arc::new(StaticSite::new())).await);
        assert_eq!(server.get_info().server_info.name, "mcp-swcache");
    }
}
