//! Cache orchestration for previews and imported tables.
//!
//! The orchestrator owns both artifact stores and the single-flight tables,
//! and drives each request through the same lifecycle:
//!
//! - `checking`: resolve the cache key and look for a committed artifact
//! - `hit_serving`: an artifact exists and is returned as is
//! - `miss_computing`: the artifact is computed under single-flight
//! - `committing`: the finished artifact is renamed into the store
//! - `done` / `failed`
//!
//! Previews are keyed by content fingerprint, tables by source id (see
//! [`table_key`]). A failed computation leaves nothing behind, so the next
//! request simply retries.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use cairn_core::{Action, AppConfig, ArtifactStore, DocumentStore, Error, FsDocumentStore, SingleFlight, TableDescriptor};

use crate::catalog::{CatalogRegistrar, DuckDbCatalog};
use crate::convert::{Converter, SofficeConverter};
use crate::tabular::TabularEngine;

mod preview;
mod tables;

#[cfg(test)]
mod testing;

pub use preview::{PreviewArtifact, PreviewOutcome};
pub use tables::table_key;

/// Lifecycle state of one request, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Checking,
    HitServing,
    MissComputing,
    Committing,
    Done,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Checking => "checking",
            Phase::HitServing => "hit_serving",
            Phase::MissComputing => "miss_computing",
            Phase::Committing => "committing",
            Phase::Done => "done",
            Phase::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Entry point for every cache operation.
pub struct Orchestrator {
    config: AppConfig,
    previews: ArtifactStore,
    tables: ArtifactStore,
    documents: Arc<dyn DocumentStore>,
    converter: Arc<dyn Converter>,
    catalog: Arc<dyn CatalogRegistrar>,
    tabular: TabularEngine,
    preview_flights: SingleFlight<PathBuf>,
    table_flights: SingleFlight<TableDescriptor>,
}

impl Orchestrator {
    /// Build an orchestrator from explicit collaborators.
    pub fn new(
        config: AppConfig, documents: Arc<dyn DocumentStore>, converter: Arc<dyn Converter>,
        catalog: Arc<dyn CatalogRegistrar>,
    ) -> Self {
        Self {
            previews: ArtifactStore::new(config.previews_dir(), "pdf"),
            tables: ArtifactStore::new(config.tables_dir(), "parquet"),
            tabular: TabularEngine::new(config.csv_encodings.clone()),
            preview_flights: SingleFlight::new(),
            table_flights: SingleFlight::new(),
            config,
            documents,
            converter,
            catalog,
        }
    }

    /// Build the production stack: filesystem documents, soffice, DuckDB.
    ///
    /// Fails with `ENGINE_UNAVAILABLE` if the catalog cannot be opened.
    pub fn from_config(config: AppConfig) -> Result<Self, Error> {
        let catalog = Arc::new(DuckDbCatalog::open(config.catalog_path())?);
        let converter = Arc::new(SofficeConverter::new(&config.converter_bin));
        let documents = Arc::new(FsDocumentStore::new(&config.documents_root));
        tracing::info!(
            base_dir = %config.base_dir.display(),
            converter = %config.converter_bin,
            documents_root = %config.documents_root.display(),
            "orchestrator ready"
        );
        Ok(Self::new(config, documents, converter, catalog))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn documents(&self) -> &Arc<dyn DocumentStore> {
        &self.documents
    }

    pub fn preview_store(&self) -> &ArtifactStore {
        &self.previews
    }

    pub fn table_store(&self) -> &ArtifactStore {
        &self.tables
    }

    async fn ensure_readable(&self, id: &str, principal: &str) -> Result<(), Error> {
        if self.documents.check_permission(id, Action::Read, principal).await? {
            Ok(())
        } else {
            tracing::warn!(source_id = id, principal, "read permission denied");
            Err(Error::PermissionDenied(format!("{principal} may not read '{id}'")))
        }
    }
}

fn log_failure(key: &str, err: &Error) {
    tracing::warn!(key, phase = %Phase::Failed, retryable = err.is_retryable(), error = %err, "computation failed");
}
