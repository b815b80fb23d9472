//! Unified error types for cairn.
//!
//! Every failure that crosses the orchestrator boundary is one of these
//! variants. The enum is `Clone` so that all callers sharing a single-flight
//! computation receive the identical failure; non-`Clone` sources are held
//! behind an `Arc`.

use std::path::PathBuf;
use std::sync::Arc;

use rmcp::model::{ErrorCode, ErrorData as McpError};

/// Unified error types for the cairn cache.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Media type or extension is not in the allow-list.
    #[error("NOT_SUPPORTED: {0}")]
    NotSupported(String),

    /// The principal may not read the source.
    #[error("PERMISSION_DENIED: {0}")]
    PermissionDenied(String),

    /// Source or cached artifact is missing.
    #[error("NOT_FOUND: {0}")]
    NotFound(String),

    /// Invalid input parameters.
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Cache key failed validation.
    #[error("INVALID_KEY: {0}")]
    InvalidKey(String),

    /// CSV bytes did not decode under any configured encoding.
    #[error("UNDECODABLE_TEXT: {0}")]
    UndecodableText(String),

    /// Media type is neither CSV nor a spreadsheet.
    #[error("UNSUPPORTED_MEDIA_TYPE: {0}")]
    UnsupportedMediaType(String),

    /// The source decoded but could not be parsed into a table.
    #[error("PARSE_FAILED: {0}")]
    ParseFailed(String),

    /// The external converter exited with a nonzero status.
    #[error("CONVERSION_FAILED: {stderr}")]
    ConversionFailed { stderr: String },

    /// The external converter did not finish in time.
    #[error("CONVERSION_TIMEOUT: converter did not finish within {0}ms")]
    ConversionTimeout(u64),

    /// The converter succeeded but the expected output file is missing.
    #[error("CONVERSION_INCOMPLETE: expected output {0} was not produced")]
    ConversionIncomplete(String),

    /// Catalog registration failed.
    #[error("REGISTRATION_FAILED: {0}")]
    RegistrationFailed(String),

    /// The analytical engine is not compiled in or cannot be opened.
    #[error("ENGINE_UNAVAILABLE: {0}")]
    EngineUnavailable(String),

    /// Reading or writing the columnar format failed.
    #[error("COLUMNAR_ERROR: {0}")]
    Columnar(String),

    /// Filesystem operation failed.
    #[error("IO_ERROR: {path}: {source}")]
    Io { path: PathBuf, source: Arc<std::io::Error> },

    /// A background task panicked or was aborted.
    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl Error {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io { path: path.into(), source: Arc::new(source) }
    }

    /// External tool failures that a later request may succeed at.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::ConversionFailed { .. } | Error::ConversionTimeout(_) | Error::ConversionIncomplete(_)
        )
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let code = match &err {
            Error::InvalidInput(_) | Error::InvalidKey(_) => -32602,
            Error::NotSupported(_) => -32010,
            Error::PermissionDenied(_) => -32011,
            Error::NotFound(_) => -32001,
            Error::UndecodableText(_) => -32020,
            Error::UnsupportedMediaType(_) => -32021,
            Error::ParseFailed(_) => -32022,
            Error::ConversionFailed { .. } => -32030,
            Error::ConversionTimeout(_) => -32031,
            Error::ConversionIncomplete(_) => -32032,
            Error::RegistrationFailed(_) => -32040,
            Error::EngineUnavailable(_) => -32041,
            Error::Columnar(_) | Error::Io { .. } | Error::Internal(_) => -32002,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}
