//! Core types and shared functionality for cairn.
//!
//! This crate provides:
//! - Artifact cache primitives (fingerprints, store, single-flight)
//! - Unified error types
//! - Configuration structures
//! - The document-store contract and table descriptors

pub mod cache;
pub mod config;
pub mod error;
pub mod source;
pub mod table;

pub use cache::{ArtifactStore, SingleFlight};
pub use config::{AppConfig, ConfigError, TextEncoding};
pub use error::Error;
pub use source::{Action, DocumentStore, FsDocumentStore, SourceMetadata, SourceRef};
pub use table::{ColumnInfo, TableDescriptor, format_size};
