//! MCP service implementation using rmcp.
//!
//! Tools are not known at compile time, so `ServerHandler` is implemented by
//! hand: `tools/list` exports the registry's descriptors and `tools/call`
//! dispatches through [`ToolRegistry::invoke`](crate::tools::ToolRegistry::invoke).

use crate::bridge::ToolBridge;
use crate::tools::{ToolDescriptor, ToolResult};
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    model::{
        CallToolRequestParam, CallToolResult, Content, Implementation, ListToolsResult,
        PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo, Tool,
    },
    service::RequestContext,
};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct BridgeService {
    bridge: Arc<ToolBridge>,
}

impl BridgeService {
    pub fn new(bridge: Arc<ToolBridge>) -> Self {
        Self { bridge }
    }

    pub fn bridge(&self) -> &Arc<ToolBridge> {
        &self.bridge
    }

    /// Tool catalog in registration order.
    pub fn tools(&self) -> Vec<Tool> {
        self.bridge
            .registry()
            .descriptors()
            .map(to_mcp_tool)
            .collect()
    }
}

fn to_mcp_tool(descriptor: &ToolDescriptor) -> Tool {
    Tool::new(
        descriptor.name.clone(),
        descriptor.description.clone(),
        Arc::new(descriptor.input_schema()),
    )
}

/// Failures are reported in-band with `is_error` set, not as protocol errors.
pub fn to_call_result(result: ToolResult) -> CallToolResult {
    match result {
        ToolResult::Success { text } => CallToolResult::success(vec![Content::text(text)]),
        ToolResult::Failure { message } => CallToolResult::error(vec![Content::text(message)]),
    }
}

impl ServerHandler for BridgeService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "mcp-tool-bridge".to_owned(),
                title: Some("MCP Tool Bridge".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Tools for an issue tracker (jira_*) and a SQL database (sql_*).\n\
                \n\
                ## SQL\n\
                1. Call `sql_get_tables` or `sql_get_database_schema` to discover tables\n\
                2. Use `sql_execute_query` for reads; pass values through `params` as a JSON array\n\
                3. `sql_execute_statement` is only listed when the database is writable\n\
                \n\
                ## Jira\n\
                - `jira_get_issue` lists the transitions available for `jira_transition_issue`\n\
                - `jira_search_issues` takes a JQL query"
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(self.tools()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        debug!(tool = %request.name, "Tool call received");
        let result = self
            .bridge
            .registry()
            .invoke(&request.name, request.arguments, context.ct.clone())
            .await;
        Ok(to_call_result(result))
    }
}
