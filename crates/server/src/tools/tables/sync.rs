//! table_sync tool implementation.
//!
//! Re-imports a document from its current content.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use cairn_pipeline::Orchestrator;

use crate::tools::{json_result, principal_or_default};

/// Parameters for the table_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TableSyncParams {
    /// Document id in the document store.
    pub id: String,

    /// Who is asking; checked against the document store's permissions.
    pub principal: Option<String>,
}

/// Implementation of the table_sync tool.
pub async fn sync_impl(orchestrator: &Orchestrator, params: TableSyncParams) -> Result<CallToolResult, McpError> {
    let principal = principal_or_default(params.principal);
    let descriptor = orchestrator.sync_table(&params.id, &principal).await?;
    json_result(&descriptor)
}
