//! preview_sweep tool implementation.
//!
//! Deletes previews that have not been modified recently.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use cairn_pipeline::Orchestrator;

use crate::tools::json_result;

/// Parameters for the preview_sweep tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PreviewSweepParams {
    /// Delete previews older than this many days (server default when omitted).
    pub older_than_days: Option<u64>,
}

/// Output from the preview_sweep tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PreviewSweepOutput {
    /// Number of previews deleted.
    pub deleted: u64,
}

/// Implementation of the preview_sweep tool.
pub async fn sweep_impl(orchestrator: &Orchestrator, params: PreviewSweepParams) -> Result<CallToolResult, McpError> {
    let deleted = orchestrator.sweep_previews(params.older_than_days).await?;
    json_result(&PreviewSweepOutput { deleted })
}
