//! Table descriptors returned by imports and schema lookups.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One column of an imported table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self { name: name.into(), data_type: data_type.into() }
    }
}

/// Inferred shape of a cached table.
///
/// Rebuilt from the cached file each time it is read; the file carries the
/// source id, table name and import time in its key/value metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct TableDescriptor {
    /// Document-store id the table was imported from.
    pub source_id: String,
    /// Catalog view name derived from the display name.
    pub table_name: String,
    /// Display name at import time.
    pub original_name: String,
    /// Columns in source order.
    pub columns: Vec<ColumnInfo>,
    pub row_count: u64,
    /// Location of the cached Parquet file.
    pub path: PathBuf,
    /// RFC 3339 import timestamp.
    pub cached_at: String,
    pub size_bytes: u64,
    /// Human-readable `size_bytes`.
    pub size: String,
    /// Set when the file was cached but catalog registration failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_error: Option<String>,
}

/// Format a byte count with one decimal, e.g. `1.5 KB`.
pub fn format_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if size < 1024.0 {
            return format!("{size:.1} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.1} TB")
}
