//! Table-related MCP tools.
//!
//! This module provides tools for importing CSV and spreadsheet documents as
//! queryable tables and for inspecting or dropping them.

pub mod import;
pub mod list;
pub mod remove;
pub mod rows;
pub mod schema;
pub mod sync;

pub use import::{TableImportParams, import_impl};
pub use list::{TableListParams, list_impl};
pub use remove::{TableRemoveParams, remove_impl};
pub use rows::{TablePreviewParams, rows_impl};
pub use schema::{TableSchemaParams, schema_impl};
pub use sync::{TableSyncParams, sync_impl};
