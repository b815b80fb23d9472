//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `conversion_timeout_ms` is under 1s or over 10 minutes
    /// - `converter_bin` is empty
    /// - a preview extension is empty or contains a dot
    /// - a row limit is 0 or the default exceeds the maximum
    ///
    /// Returns `ConfigError::Missing` if no preview extensions or no CSV
    /// encodings are configured.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.conversion_timeout_ms < 1_000 {
            return Err(ConfigError::Invalid {
                field: "conversion_timeout_ms".into(),
                reason: "must be at least 1000ms".into(),
            });
        }
        if self.conversion_timeout_ms > 600_000 {
            return Err(ConfigError::Invalid {
                field: "conversion_timeout_ms".into(),
                reason: "must not exceed 10 minutes (600000ms)".into(),
            });
        }

        if self.converter_bin.trim().is_empty() {
            return Err(ConfigError::Invalid { field: "converter_bin".into(), reason: "must not be empty".into() });
        }

        if self.preview_extensions.is_empty() {
            return Err(ConfigError::Missing {
                field: "preview_extensions".into(),
                hint: "list at least one extension, e.g. [\"docx\"]".into(),
            });
        }
        if let Some(bad) = self.preview_extensions.iter().find(|e| e.is_empty() || e.contains('.')) {
            return Err(ConfigError::Invalid {
                field: "preview_extensions".into(),
                reason: format!("'{bad}' must be a bare extension without a dot"),
            });
        }

        if self.csv_encodings.is_empty() {
            return Err(ConfigError::Missing {
                field: "csv_encodings".into(),
                hint: "list at least one encoding, e.g. [\"utf-8\"]".into(),
            });
        }

        if self.preview_row_limit == 0 || self.max_preview_rows == 0 {
            return Err(ConfigError::Invalid {
                field: "preview_row_limit".into(),
                reason: "row limits must be greater than 0".into(),
            });
        }
        if self.preview_row_limit > self.max_preview_rows {
            return Err(ConfigError::Invalid {
                field: "preview_row_limit".into(),
                reason: format!("must not exceed max_preview_rows ({})", self.max_preview_rows),
            });
        }

        if self.preview_max_age_days == 0 {
            tracing::warn!("preview_max_age_days is 0; a default sweep removes every cached preview");
        }

        Ok(())
    }
}
