//! table_remove tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use cairn_pipeline::Orchestrator;

use crate::tools::json_result;

/// Parameters for the table_remove tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TableRemoveParams {
    /// Document id the table was imported from.
    pub id: String,
}

/// Output from the table_remove tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TableRemoveOutput {
    /// Whether a cached table existed.
    pub removed: bool,
}

/// Implementation of the table_remove tool.
pub async fn remove_impl(orchestrator: &Orchestrator, params: TableRemoveParams) -> Result<CallToolResult, McpError> {
    let removed = orchestrator.remove_table(&params.id).await?;
    json_result(&TableRemoveOutput { removed })
}
