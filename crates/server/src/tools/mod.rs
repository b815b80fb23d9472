//! MCP tool implementations.
//!
//! This module contains all tools exposed by the cairn server, grouped by
//! artifact kind.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use cairn_core::Error;

pub mod preview;
pub mod tables;

#[cfg(test)]
pub(crate) mod testing;

/// Principal used when a tool call does not name one.
pub const DEFAULT_PRINCIPAL: &str = "mcp";

/// Serialize a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::Internal(format!("failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

pub(crate) fn principal_or_default(principal: Option<String>) -> String {
    principal.filter(|p| !p.trim().is_empty()).unwrap_or_else(|| DEFAULT_PRINCIPAL.to_string())
}
