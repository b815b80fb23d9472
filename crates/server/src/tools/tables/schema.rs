//! table_schema tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use cairn_core::ColumnInfo;
use cairn_pipeline::Orchestrator;

use crate::tools::json_result;

/// Parameters for the table_schema tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TableSchemaParams {
    /// Document id the table was imported from.
    pub id: String,
}

/// Output from the table_schema tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TableSchemaOutput {
    pub source_id: String,
    pub table_name: String,
    pub row_count: u64,
    pub columns: Vec<ColumnInfo>,
}

/// Implementation of the table_schema tool.
pub async fn schema_impl(orchestrator: &Orchestrator, params: TableSchemaParams) -> Result<CallToolResult, McpError> {
    let desc = orchestrator.get_schema(&params.id).await?;
    json_result(&TableSchemaOutput {
        source_id: desc.source_id,
        table_name: desc.table_name,
        row_count: desc.row_count,
        columns: desc.columns,
    })
}
