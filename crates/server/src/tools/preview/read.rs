//! preview_read tool implementation.
//!
//! Returns the bytes of a committed preview, base64-encoded.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use cairn_core::format_size;
use cairn_pipeline::Orchestrator;

use crate::tools::json_result;

/// Parameters for the preview_read tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PreviewReadParams {
    /// Preview key returned by preview_get (16 lowercase hex characters).
    pub key: String,
}

/// Output from the preview_read tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PreviewReadOutput {
    pub key: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub size: String,
    /// PDF bytes, standard base64.
    pub data_base64: String,
}

/// Implementation of the preview_read tool.
pub async fn read_impl(orchestrator: &Orchestrator, params: PreviewReadParams) -> Result<CallToolResult, McpError> {
    let bytes = orchestrator.read_preview(&params.key).await?;
    let size_bytes = bytes.len() as u64;

    let output = PreviewReadOutput {
        key: params.key,
        mime_type: "application/pdf".to_string(),
        size_bytes,
        size: format_size(size_bytes),
        data_base64: STANDARD.encode(&bytes),
    };

    json_result(&output)
}
