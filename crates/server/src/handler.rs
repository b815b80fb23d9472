//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use cairn_pipeline::Orchestrator;

use crate::tools::preview::{
    PreviewGetParams, PreviewReadParams, PreviewSweepParams, get_impl, read_impl, sweep_impl,
};
use crate::tools::tables::{
    TableImportParams, TableListParams, TablePreviewParams, TableRemoveParams, TableSchemaParams, TableSyncParams,
    import_impl, list_impl, remove_impl, rows_impl, schema_impl, sync_impl,
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

/// The main MCP server handler for cairn.
#[derive(Clone)]
pub struct CairnServer {
    tool_router: ToolRouter<Self>,
    orchestrator: Arc<Orchestrator>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl CairnServer {
    /// Create a new server handler around a shared orchestrator.
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { tool_router: Self::tool_router(), orchestrator }
    }

    #[tool(
        description = "Get a PDF preview of an office document (doc, docx, odt, rtf, xls, xlsx, ods, csv, ppt, pptx, odp). Converts on first request and caches by content."
    )]
    async fn preview_get(&self, params: Parameters<PreviewGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.orchestrator, params.0).await
    }

    #[tool(description = "Read a cached PDF preview by key. Returns base64-encoded bytes.")]
    async fn preview_read(&self, params: Parameters<PreviewReadParams>) -> Result<CallToolResult, McpError> {
        read_impl(&self.orchestrator, params.0).await
    }

    #[tool(description = "Delete cached PDF previews older than a number of days.")]
    async fn preview_sweep(&self, params: Parameters<PreviewSweepParams>) -> Result<CallToolResult, McpError> {
        sweep_impl(&self.orchestrator, params.0).await
    }

    /// Import a CSV or spreadsheet document as a queryable table.
    ///
    /// Column names are normalized and the table is registered as a view named
    /// after the document.
    #[tool(
        description = "Import a CSV or spreadsheet document as a queryable table. Returns the table name, columns and row count."
    )]
    async fn table_import(&self, params: Parameters<TableImportParams>) -> Result<CallToolResult, McpError> {
        import_impl(&self.orchestrator, params.0).await
    }

    #[tool(description = "Re-import a document's table from its current content.")]
    async fn table_sync(&self, params: Parameters<TableSyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(&self.orchestrator, params.0).await
    }

    #[tool(description = "Get the column names and types of an imported table.")]
    async fn table_schema(&self, params: Parameters<TableSchemaParams>) -> Result<CallToolResult, McpError> {
        schema_impl(&self.orchestrator, params.0).await
    }

    #[tool(description = "Get the first rows of an imported table as JSON objects.")]
    async fn table_preview(&self, params: Parameters<TablePreviewParams>) -> Result<CallToolResult, McpError> {
        rows_impl(&self.orchestrator, params.0).await
    }

    #[tool(description = "Remove an imported table and drop its view.")]
    async fn table_remove(&self, params: Parameters<TableRemoveParams>) -> Result<CallToolResult, McpError> {
        remove_impl(&self.orchestrator, params.0).await
    }

    #[tool(description = "List all imported tables with size and row counts.")]
    async fn table_list(&self, params: Parameters<TableListParams>) -> Result<CallToolResult, McpError> {
        list_impl(&self.orchestrator, params.0).await
    }
}

impl ServerHandler for CairnServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "cairn".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Document previews and tabular imports. Use preview_get for PDFs and table_import before querying tables."
                    .into(),
            ),
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
