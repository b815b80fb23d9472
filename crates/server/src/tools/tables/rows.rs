//! table_preview tool implementation.
//!
//! Returns the first rows of an imported table.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use cairn_pipeline::Orchestrator;

use crate::tools::json_result;

/// Parameters for the table_preview tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TablePreviewParams {
    /// Document id the table was imported from.
    pub id: String,

    /// Number of rows to return (server default when omitted).
    pub limit: Option<usize>,
}

/// Output from the table_preview tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TablePreviewOutput {
    pub source_id: String,
    /// Rows keyed by column name, in column order.
    pub rows: Vec<Map<String, Value>>,
}

/// Implementation of the table_preview tool.
pub async fn rows_impl(orchestrator: &Orchestrator, params: TablePreviewParams) -> Result<CallToolResult, McpError> {
    let rows = orchestrator.get_preview_rows(&params.id, params.limit).await?;
    json_result(&TablePreviewOutput { source_id: params.id, rows })
}
