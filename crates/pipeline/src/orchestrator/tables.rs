//! Imported tables keyed by source id.

use std::sync::Arc;

use cairn_core::cache::fingerprint_bytes;
use cairn_core::cache::store::validate_key;
use cairn_core::{ArtifactStore, DocumentStore, Error, SourceRef, TableDescriptor};
use serde_json::{Map, Value};

use super::{Orchestrator, Phase, log_failure};
use crate::catalog::CatalogRegistrar;
use crate::tabular::{self, TableMeta, TabularEngine};

/// Store key for a source id.
///
/// Ids that are already safe file stems are used as is; anything else (paths,
/// dots, spaces) is replaced by a prefixed fingerprint of the id. Ids that
/// already carry the prefix are hashed too, so they cannot alias a hashed key.
pub fn table_key(id: &str) -> String {
    if !id.starts_with(HASHED_KEY_PREFIX) && validate_key(id).is_ok() {
        id.to_string()
    } else {
        format!("{HASHED_KEY_PREFIX}{}", fingerprint_bytes(id.as_bytes()))
    }
}

const HASHED_KEY_PREFIX: &str = "h-";

/// Everything an import needs, owned so it can run on its own task.
struct ImportJob {
    key: String,
    source: SourceRef,
    force: bool,
    store: ArtifactStore,
    documents: Arc<dyn DocumentStore>,
    catalog: Arc<dyn CatalogRegistrar>,
    engine: TabularEngine,
}

impl Orchestrator {
    /// Import a CSV or spreadsheet source and register it in the catalog.
    ///
    /// A source that is already cached is returned from the cache without
    /// being parsed again; use [`Orchestrator::sync_table`] to refresh it.
    pub async fn import_table(&self, source: &SourceRef, principal: &str) -> Result<TableDescriptor, Error> {
        self.ensure_readable(&source.id, principal).await?;
        tabular::detect_kind(&source.media_type, &source.display_name)?;

        tracing::debug!(source_id = %source.id, phase = %Phase::Checking, "import requested");
        if self.tables.exists(&table_key(&source.id)).await? {
            tracing::debug!(source_id = %source.id, phase = %Phase::HitServing, "table cache hit");
            return self.describe(&source.id).await;
        }
        self.run_import(source.clone(), false).await
    }

    /// Re-import a source from its current content, replacing the cached table.
    ///
    /// The source is resolved through the document store, so renames and
    /// content changes since the last import are picked up.
    pub async fn sync_table(&self, id: &str, principal: &str) -> Result<TableDescriptor, Error> {
        self.ensure_readable(id, principal).await?;
        let source = self.documents.resolve(id).await?;
        tabular::detect_kind(&source.media_type, &source.display_name)?;
        self.run_import(source, true).await
    }

    /// Column names and types of a cached table.
    pub async fn get_schema(&self, id: &str) -> Result<TableDescriptor, Error> {
        self.require_cached(id).await?;
        self.describe(id).await
    }

    /// Leading rows of a cached table as ordered JSON objects.
    ///
    /// `limit` defaults to the configured preview size and is capped at the
    /// configured maximum.
    pub async fn get_preview_rows(&self, id: &str, limit: Option<usize>) -> Result<Vec<Map<String, Value>>, Error> {
        self.require_cached(id).await?;
        let limit = limit.unwrap_or(self.config.preview_row_limit).min(self.config.max_preview_rows);
        let path = self.tables.path_for(&table_key(id))?;
        tokio::task::spawn_blocking(move || tabular::read_rows(&path, limit))
            .await
            .map_err(|e| Error::Internal(format!("row preview task failed: {e}")))?
    }

    /// Drop a cached table and its catalog view. Returns whether one existed.
    ///
    /// A view that fails to drop is logged; the cached file is still removed.
    pub async fn remove_table(&self, id: &str) -> Result<bool, Error> {
        let view = match self.describe(id).await {
            Ok(desc) => Some(desc.table_name),
            Err(Error::NotFound(_)) => None,
            Err(e) => {
                tracing::warn!(source_id = %id, error = %e, "cached table unreadable; removing file only");
                None
            }
        };

        let removed = self.tables.remove(&table_key(id)).await?;
        if let Some(view) = view {
            if let Err(e) = release_view(&self.tables, self.catalog.as_ref(), &view, id).await {
                tracing::warn!(source_id = %id, view = %view, error = %e, "failed to release view");
            }
        }
        if removed {
            tracing::info!(source_id = %id, "table removed");
        }
        Ok(removed)
    }

    /// Descriptors of every cached table, ordered by source id.
    ///
    /// Files that cannot be inspected are skipped with a warning.
    pub async fn list_tables(&self) -> Result<Vec<TableDescriptor>, Error> {
        let mut out = Vec::new();
        for key in self.tables.keys().await? {
            match describe(&self.tables, &key).await {
                Ok(desc) => out.push(desc),
                Err(e) => tracing::warn!(key = %key, error = %e, "skipping unreadable table"),
            }
        }
        out.sort_by(|a, b| a.source_id.cmp(&b.source_id));
        Ok(out)
    }

    /// Whether a table for `id` is cached.
    pub async fn is_cached(&self, id: &str) -> Result<bool, Error> {
        self.tables.exists(&table_key(id)).await
    }

    async fn require_cached(&self, id: &str) -> Result<(), Error> {
        if self.is_cached(id).await? {
            Ok(())
        } else {
            Err(Error::NotFound(format!("table '{id}' is not cached; import it first")))
        }
    }

    async fn describe(&self, id: &str) -> Result<TableDescriptor, Error> {
        describe(&self.tables, &table_key(id)).await
    }

    async fn run_import(&self, source: SourceRef, force: bool) -> Result<TableDescriptor, Error> {
        let job = ImportJob {
            key: table_key(&source.id),
            source,
            force,
            store: self.tables.clone(),
            documents: Arc::clone(&self.documents),
            catalog: Arc::clone(&self.catalog),
            engine: self.tabular.clone(),
        };
        let key = job.key.clone();
        self.table_flights
            .run(&key, move || async move {
                let key = job.key.clone();
                let result = job.run().await;
                if let Err(e) = &result {
                    log_failure(&key, e);
                }
                result
            })
            .await
    }
}

impl ImportJob {
    async fn run(self) -> Result<TableDescriptor, Error> {
        let id = self.source.id.clone();
        let previous = match describe(&self.store, &self.key).await {
            Ok(desc) if !self.force => {
                tracing::debug!(source_id = %id, phase = %Phase::HitServing, "table committed by an earlier flight");
                return Ok(desc);
            }
            Ok(desc) => Some(desc),
            Err(Error::NotFound(_)) => None,
            Err(e) => {
                tracing::warn!(source_id = %id, error = %e, "replacing unreadable cached table");
                None
            }
        };

        tracing::info!(source_id = %id, name = %self.source.display_name, phase = %Phase::MissComputing, "importing");
        let content = self.documents.get_content(&id).await?;
        let engine = self.engine.clone();
        let source = self.source.clone();
        let imported = tokio::task::spawn_blocking(move || {
            engine.import(&content, &source.media_type, &source.display_name)
        })
        .await
        .map_err(|e| Error::Internal(format!("import task failed: {e}")))??;

        let meta = TableMeta {
            source_id: id.clone(),
            table_name: imported.table_name.clone(),
            original_name: self.source.display_name.clone(),
            cached_at: chrono::Utc::now().to_rfc3339(),
        };

        let mut temp = self.store.temp_file().await?;
        let temp = tokio::task::spawn_blocking(move || {
            tabular::write_table(&imported.batch, &meta, temp.as_file_mut())?;
            temp.as_file().sync_all().map_err(|e| Error::io(temp.path(), e))?;
            Ok::<_, Error>(temp)
        })
        .await
        .map_err(|e| Error::Internal(format!("write task failed: {e}")))??;

        tracing::debug!(source_id = %id, phase = %Phase::Committing, "committing table");
        let temp = temp.into_temp_path();
        let path = self.store.commit(&self.key, &temp).await?;
        // The rename consumed the temp file; nothing left to clean up.
        let _ = temp.keep();

        let mut desc = describe(&self.store, &self.key).await?;
        debug_assert_eq!(desc.path, path);

        if let Some(old) = previous.map(|p| p.table_name).filter(|old| *old != desc.table_name) {
            if let Err(e) = release_view(&self.store, self.catalog.as_ref(), &old, &id).await {
                tracing::warn!(source_id = %id, view = %old, error = %e, "failed to release renamed view");
            }
        }
        if let Err(e) = self.catalog.register(&desc.table_name, &path).await {
            tracing::warn!(source_id = %id, view = %desc.table_name, error = %e, "table cached but not registered");
            desc.catalog_error = Some(e.to_string());
        }

        tracing::info!(
            source_id = %id,
            table = %desc.table_name,
            rows = desc.row_count,
            phase = %Phase::Done,
            "table ready"
        );
        Ok(desc)
    }
}

/// Hand `view` over to the newest other cached table deriving the same name,
/// or drop it when no such table is left.
///
/// Sources with equal display names share one view; releasing it for `source_id`
/// must not strip the binding from a table that is still cached.
async fn release_view(
    store: &ArtifactStore, catalog: &dyn CatalogRegistrar, view: &str, source_id: &str,
) -> Result<(), Error> {
    let mut heir: Option<(chrono::DateTime<chrono::FixedOffset>, TableDescriptor)> = None;
    for key in store.keys().await? {
        let Ok(desc) = describe(store, &key).await else { continue };
        if desc.source_id == source_id || desc.table_name != view {
            continue;
        }
        let Ok(at) = chrono::DateTime::parse_from_rfc3339(&desc.cached_at) else { continue };
        if heir.as_ref().is_none_or(|(best, _)| at > *best) {
            heir = Some((at, desc));
        }
    }

    match heir {
        Some((_, desc)) => {
            tracing::debug!(view, source_id = %desc.source_id, "view rebound to remaining table");
            catalog.register(view, &desc.path).await
        }
        None => catalog.unregister(view).await,
    }
}

async fn describe(store: &ArtifactStore, key: &str) -> Result<TableDescriptor, Error> {
    let path = store.path_for(key)?;
    tokio::task::spawn_blocking(move || tabular::read_descriptor(&path))
        .await
        .map_err(|e| Error::Internal(format!("describe task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use cairn_core::ColumnInfo;

    const SALES: &[u8] = b"Name,Amount ($)\nAlice,10.5\nBob,20\nCarol,30.25\n";

    #[tokio::test]
    async fn test_import_round_trip() {
        let h = Harness::new();
        let source = h.add_doc("f1", "Sales Report.csv", SALES);

        let desc = h.orchestrator.import_table(&source, "u").await.unwrap();
        assert_eq!(desc.source_id, "f1");
        assert_eq!(desc.table_name, "sales_report");
        assert_eq!(desc.original_name, "Sales Report.csv");
        assert_eq!(desc.row_count, 3);
        assert_eq!(desc.columns, vec![ColumnInfo::new("name", "string"), ColumnInfo::new("amount____", "float64")]);
        assert!(desc.path.ends_with("tables/f1.parquet"));
        assert!(desc.catalog_error.is_none());
        assert_eq!(h.catalog.live_views(), vec![("sales_report".to_string(), desc.path.clone())]);

        let schema = h.orchestrator.get_schema("f1").await.unwrap();
        assert_eq!(schema.columns, desc.columns);

        let rows = h.orchestrator.get_preview_rows("f1", Some(2)).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], Value::from("Alice"));
        assert_eq!(rows[0]["amount____"].as_f64(), Some(10.5));
        assert_eq!(rows[1]["name"], Value::from("Bob"));
        assert_eq!(rows[1]["amount____"].as_f64(), Some(20.0));
    }

    #[tokio::test]
    async fn test_import_is_idempotent() {
        let h = Harness::new();
        let source = h.add_doc("f1", "sales.csv", SALES);

        let first = h.orchestrator.import_table(&source, "u").await.unwrap();
        let second = h.orchestrator.import_table(&source, "u").await.unwrap();
        assert_eq!(first.cached_at, second.cached_at);
        assert_eq!(h.documents.content_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_imports_parse_once() {
        let h = Harness::new();
        h.documents.set_delay(Duration::from_millis(100));
        let source = h.add_doc("f1", "sales.csv", SALES);
        let orchestrator = Arc::new(h.orchestrator);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let orchestrator = Arc::clone(&orchestrator);
            let source = source.clone();
            handles.push(tokio::spawn(async move { orchestrator.import_table(&source, "u").await }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap().row_count, 3);
        }
        assert_eq!(h.documents.content_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_sync_picks_up_changes_and_renames_view() {
        let h = Harness::new();
        let source = h.add_doc("f1", "sales.csv", SALES);
        h.orchestrator.import_table(&source, "u").await.unwrap();

        h.update_doc("f1", "Q2 Sales.csv", b"Name,Amount ($)\nDave,1\n");
        let desc = h.orchestrator.sync_table("f1", "u").await.unwrap();
        assert_eq!(desc.table_name, "q2_sales");
        assert_eq!(desc.row_count, 1);
        assert_eq!(desc.columns[1], ColumnInfo::new("amount____", "int64"));

        let views: Vec<String> = h.catalog.live_views().into_iter().map(|(name, _)| name).collect();
        assert_eq!(views, vec!["q2_sales".to_string()]);
        assert_eq!(h.orchestrator.list_tables().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_media_type_writes_nothing() {
        let h = Harness::new();
        let source = h.add_doc_typed("z1", "bundle.zip", "application/zip", b"PK\x03\x04");

        let err = h.orchestrator.import_table(&source, "u").await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedMediaType(_)));
        assert!(!h.orchestrator.table_store().dir().exists());
        assert_eq!(h.documents.content_calls.load(Ordering::SeqCst), 0);
        assert!(h.catalog.live_views().is_empty());
    }

    #[tokio::test]
    async fn test_parse_failure_leaves_no_artifact() {
        let h = Harness::new();
        let source = h.add_doc("bad", "bad.csv", b"a,b\n1,2,3\n");

        let err = h.orchestrator.import_table(&source, "u").await.unwrap_err();
        assert!(matches!(err, Error::ParseFailed(_)));
        assert!(!h.orchestrator.is_cached("bad").await.unwrap());
        assert!(h.orchestrator.table_store().keys().await.unwrap().is_empty());
        let leftovers = std::fs::read_dir(h.orchestrator.table_store().dir())
            .map(|entries| entries.count())
            .unwrap_or(0);
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_registration_failure_is_reported_not_fatal() {
        let h = Harness::new();
        h.catalog.fail_register(true);
        let source = h.add_doc("f1", "sales.csv", SALES);

        let desc = h.orchestrator.import_table(&source, "u").await.unwrap();
        assert!(desc.catalog_error.as_deref().is_some_and(|e| e.contains("REGISTRATION_FAILED")));
        assert!(h.orchestrator.is_cached("f1").await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_drops_view() {
        let h = Harness::new();
        let source = h.add_doc("f1", "sales.csv", SALES);
        h.orchestrator.import_table(&source, "u").await.unwrap();

        assert!(h.orchestrator.remove_table("f1").await.unwrap());
        assert!(h.catalog.live_views().is_empty());
        assert!(matches!(h.orchestrator.get_schema("f1").await, Err(Error::NotFound(_))));
        assert!(!h.orchestrator.remove_table("f1").await.unwrap());
    }

    #[tokio::test]
    async fn test_import_workbook() {
        let h = Harness::new();
        let workbook = crate::tabular::fixtures::orders_workbook();
        let source = h.add_doc_typed("w1", "Q1 Orders.xlsx", crate::tabular::fixtures::XLSX_MEDIA_TYPE, &workbook);

        let desc = h.orchestrator.import_table(&source, "u").await.unwrap();
        assert_eq!(desc.table_name, "q1_orders");
        assert_eq!(desc.row_count, 3);
        let names: Vec<&str> = desc.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["region", "units_sold", "price____", "active", "order_date"]);
        assert_eq!(desc.columns[4].data_type, "timestamp");

        let rows = h.orchestrator.get_preview_rows("w1", Some(1)).await.unwrap();
        assert_eq!(rows[0]["region"], Value::from("North"));
        assert_eq!(rows[0]["units_sold"].as_i64(), Some(3));
        assert_eq!(rows[0]["active"], Value::from(true));
        assert!(rows[0]["order_date"].as_str().unwrap().starts_with("2024-01-01"));
    }

    #[tokio::test]
    async fn test_remove_keeps_view_of_same_named_table() {
        let h = Harness::new();
        let first = h.add_doc("f1", "sales.csv", SALES);
        let second = h.add_doc("f2", "sales.csv", SALES);
        h.orchestrator.import_table(&first, "u").await.unwrap();
        let f2 = h.orchestrator.import_table(&second, "u").await.unwrap();
        assert_eq!(h.catalog.live_views(), vec![("sales".to_string(), f2.path.clone())]);

        assert!(h.orchestrator.remove_table("f1").await.unwrap());
        assert!(h.orchestrator.is_cached("f2").await.unwrap());
        assert_eq!(h.catalog.live_views(), vec![("sales".to_string(), f2.path.clone())]);

        assert!(h.orchestrator.remove_table("f2").await.unwrap());
        assert!(h.catalog.live_views().is_empty());
    }

    #[tokio::test]
    async fn test_remove_rebinds_view_to_remaining_table() {
        let h = Harness::new();
        let first = h.add_doc("f1", "sales.csv", SALES);
        let second = h.add_doc("f2", "sales.csv", SALES);
        let f1 = h.orchestrator.import_table(&first, "u").await.unwrap();
        h.orchestrator.import_table(&second, "u").await.unwrap();

        assert!(h.orchestrator.remove_table("f2").await.unwrap());
        assert_eq!(h.catalog.live_views(), vec![("sales".to_string(), f1.path)]);
    }

    #[tokio::test]
    async fn test_uncached_lookups() {
        let h = Harness::new();
        assert!(matches!(h.orchestrator.get_schema("nope").await, Err(Error::NotFound(_))));
        assert!(matches!(h.orchestrator.get_preview_rows("nope", None).await, Err(Error::NotFound(_))));
        assert!(matches!(h.orchestrator.get_schema("../x").await, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_table_key() {
        assert_eq!(table_key("1AbC_-9"), "1AbC_-9");
        let hashed = table_key("finance/Q1 sales.csv");
        assert!(hashed.starts_with("h-"));
        assert_eq!(hashed.len(), 18);
        assert_eq!(hashed, table_key("finance/Q1 sales.csv"));
        assert_ne!(hashed, table_key("finance/Q2 sales.csv"));
    }

    #[test]
    fn test_table_key_prefixed_ids_cannot_alias() {
        let hashed = table_key("finance/Q1 sales.csv");
        let literal = table_key(&hashed);
        assert_ne!(literal, hashed);
        assert!(literal.starts_with("h-"));
        assert_eq!(literal.len(), 18);
    }

    #[tokio::test]
    async fn test_path_like_ids() {
        let h = Harness::new();
        let source = h.add_doc("finance/q1.csv", "q1.csv", SALES);

        let desc = h.orchestrator.import_table(&source, "u").await.unwrap();
        assert_eq!(desc.source_id, "finance/q1.csv");
        assert!(h.orchestrator.is_cached("finance/q1.csv").await.unwrap());
        assert_eq!(h.orchestrator.get_schema("finance/q1.csv").await.unwrap().row_count, 3);
        assert!(h.orchestrator.remove_table("finance/q1.csv").await.unwrap());
    }

    #[tokio::test]
    async fn test_preview_rows_limit_is_capped() {
        let h = Harness::with_config(|c| {
            c.preview_row_limit = 2;
            c.max_preview_rows = 2;
        });
        let source = h.add_doc("f1", "sales.csv", SALES);
        h.orchestrator.import_table(&source, "u").await.unwrap();

        assert_eq!(h.orchestrator.get_preview_rows("f1", None).await.unwrap().len(), 2);
        assert_eq!(h.orchestrator.get_preview_rows("f1", Some(50)).await.unwrap().len(), 2);
        assert!(h.orchestrator.get_preview_rows("f1", Some(0)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_import_permission_denied() {
        let h = Harness::new();
        let source = h.add_doc("f1", "sales.csv", SALES);
        h.documents.deny("f1");

        assert!(matches!(h.orchestrator.import_table(&source, "u").await, Err(Error::PermissionDenied(_))));
        assert!(matches!(h.orchestrator.sync_table("f1", "u").await, Err(Error::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_list_tables() {
        let h = Harness::new();
        let a = h.add_doc("a", "alpha.csv", b"x\n1\n");
        let b = h.add_doc("b", "beta.csv", b"y\n2\n");
        h.orchestrator.import_table(&b, "u").await.unwrap();
        h.orchestrator.import_table(&a, "u").await.unwrap();

        let tables = h.orchestrator.list_tables().await.unwrap();
        let names: Vec<&str> = tables.iter().map(|t| t.table_name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta"]);
        assert!(tables.iter().all(|t| t.size.ends_with(" B") || t.size.ends_with(" KB")));
    }
}
