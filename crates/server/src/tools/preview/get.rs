//! preview_get tool implementation.
//!
//! Returns the PDF preview of a document, converting it on first request.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use cairn_pipeline::{Orchestrator, PreviewOutcome};

use crate::tools::{json_result, principal_or_default};

/// Parameters for the preview_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PreviewGetParams {
    /// Document id in the document store.
    pub id: String,

    /// Who is asking; checked against the document store's permissions.
    pub principal: Option<String>,
}

/// Output from the preview_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PreviewGetOutput {
    /// Whether the document type can be previewed at all.
    pub supported: bool,

    /// Preview key (content fingerprint), for use with preview_read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// Location of the PDF on the server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Whether the preview was served from the cache.
    pub cached: bool,

    /// Explanation when `supported` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Implementation of the preview_get tool.
pub async fn get_impl(orchestrator: &Orchestrator, params: PreviewGetParams) -> Result<CallToolResult, McpError> {
    let principal = principal_or_default(params.principal);
    let source = orchestrator.documents().resolve(&params.id).await?;

    let output = match orchestrator.get_or_build_preview(&source, &principal).await? {
        PreviewOutcome::Ready(artifact) => PreviewGetOutput {
            supported: true,
            key: Some(artifact.key),
            path: Some(artifact.path.display().to_string()),
            cached: artifact.cached,
            message: None,
        },
        PreviewOutcome::Unsupported { extension } => PreviewGetOutput {
            supported: false,
            key: None,
            path: None,
            cached: false,
            message: Some(match extension {
                Some(ext) => format!("preview not available for .{ext} files"),
                None => "preview not available for files without an extension".to_string(),
            }),
        },
    };

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{TestServer, output_json};

    #[tokio::test]
    async fn test_unsupported_type() {
        let t = TestServer::new();
        t.write_doc("photo.png", b"\x89PNG");

        let params = PreviewGetParams { id: "photo.png".into(), principal: None };
        let output: PreviewGetOutput = output_json(get_impl(&t.orchestrator, params).await.unwrap());
        assert!(!output.supported);
        assert!(output.key.is_none());
        assert!(output.message.unwrap().contains(".png"));
    }

    #[tokio::test]
    async fn test_missing_document() {
        let t = TestServer::new();
        let params = PreviewGetParams { id: "nope.docx".into(), principal: None };
        let err = get_impl(&t.orchestrator, params).await.unwrap_err();
        assert_eq!(err.code.0, -32001);
    }

    #[tokio::test]
    async fn test_path_traversal_denied() {
        let t = TestServer::new();
        let params = PreviewGetParams { id: "../secret.docx".into(), principal: Some("eve".into()) };
        let err = get_impl(&t.orchestrator, params).await.unwrap_err();
        assert_eq!(err.code.0, -32011);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_converts_then_serves_from_cache() {
        let t = TestServer::with_script_converter();
        t.write_doc("memo.docx", b"memo body");

        let params = PreviewGetParams { id: "memo.docx".into(), principal: None };
        let first: PreviewGetOutput = output_json(get_impl(&t.orchestrator, params.clone()).await.unwrap());
        assert!(first.supported);
        assert!(!first.cached);
        assert_eq!(first.key.as_deref().map(str::len), Some(16));

        let second: PreviewGetOutput = output_json(get_impl(&t.orchestrator, params).await.unwrap());
        assert!(second.cached);
        assert_eq!(second.key, first.key);
    }
}
