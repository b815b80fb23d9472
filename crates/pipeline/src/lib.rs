//! Conversion, import and catalog pipeline for cairn.
//!
//! This crate provides the document-to-PDF converter, the CSV/spreadsheet
//! import engine, catalog registration, and the orchestrator that ties them
//! to the artifact stores. It is shared by the server and CLI.

pub mod catalog;
pub mod convert;
pub mod orchestrator;
pub mod tabular;

pub use catalog::{CatalogRegistrar, DuckDbCatalog};
pub use convert::{Converter, SUPPORTED_EXTENSIONS, SofficeConverter};
pub use orchestrator::{Orchestrator, Phase, PreviewArtifact, PreviewOutcome, table_key};
pub use tabular::{ImportedTable, SourceKind, TabularEngine, detect_kind};
