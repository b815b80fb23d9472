//! table_import tool implementation.
//!
//! Imports a CSV or spreadsheet document and registers it as a view.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use cairn_pipeline::Orchestrator;

use crate::tools::{json_result, principal_or_default};

/// Parameters for the table_import tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TableImportParams {
    /// Document id in the document store.
    pub id: String,

    /// Who is asking; checked against the document store's permissions.
    pub principal: Option<String>,
}

/// Implementation of the table_import tool.
///
/// Returns the table descriptor. Already-imported documents are served from
/// the cache; use table_sync to pick up changes.
pub async fn import_impl(orchestrator: &Orchestrator, params: TableImportParams) -> Result<CallToolResult, McpError> {
    let principal = principal_or_default(params.principal);
    let source = orchestrator.documents().resolve(&params.id).await?;
    let descriptor = orchestrator.import_table(&source, &principal).await?;
    json_result(&descriptor)
}
