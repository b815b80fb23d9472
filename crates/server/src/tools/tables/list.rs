//! table_list tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use cairn_core::TableDescriptor;
use cairn_pipeline::Orchestrator;

use crate::tools::json_result;

/// Parameters for the table_list tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct TableListParams {}

/// Output from the table_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TableListOutput {
    pub tables: Vec<TableDescriptor>,
}

/// Implementation of the table_list tool.
pub async fn list_impl(orchestrator: &Orchestrator, _params: TableListParams) -> Result<CallToolResult, McpError> {
    let tables = orchestrator.list_tables().await?;
    json_result(&TableListOutput { tables })
}
