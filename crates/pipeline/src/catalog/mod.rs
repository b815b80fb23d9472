//! Catalog registration of cached tables as queryable views.
//!
//! With the `duckdb` feature (on by default) each cached Parquet file is
//! exposed as `CREATE OR REPLACE VIEW "<name>" AS SELECT * FROM read_parquet('<path>')`
//! in a DuckDB database file. A connection is opened for each operation and
//! closed right after. DuckDB allows one open handle per database file per
//! process, so operations are serialized behind an async lock.

use std::path::{Path, PathBuf};

use cairn_core::Error;

/// Exposes cached tables under a name in an analytical catalog.
#[async_trait::async_trait]
pub trait CatalogRegistrar: Send + Sync {
    /// Create or replace the view `name` over the Parquet file at `path`.
    async fn register(&self, name: &str, path: &Path) -> Result<(), Error>;

    /// Drop the view `name` if it exists.
    async fn unregister(&self, name: &str) -> Result<(), Error>;
}

/// Quote `name` as a SQL identifier.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote `value` as a SQL string literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// `CREATE OR REPLACE VIEW` statement for a cached table.
pub fn create_view_sql(name: &str, path: &Path) -> String {
    format!(
        "CREATE OR REPLACE VIEW {} AS SELECT * FROM read_parquet({})",
        quote_ident(name),
        quote_literal(&path.to_string_lossy())
    )
}

pub fn drop_view_sql(name: &str) -> String {
    format!("DROP VIEW IF EXISTS {}", quote_ident(name))
}

/// DuckDB catalog stored in a single database file.
#[derive(Debug)]
pub struct DuckDbCatalog {
    db_path: PathBuf,
    #[cfg_attr(not(feature = "duckdb"), allow(dead_code))]
    lock: tokio::sync::Mutex<()>,
}

impl DuckDbCatalog {
    /// Open (creating if needed) the catalog database at `db_path`.
    ///
    /// Fails with `ENGINE_UNAVAILABLE` when the database cannot be opened or
    /// the crate was built without the `duckdb` feature.
    #[cfg(feature = "duckdb")]
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self, Error> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        duckdb::Connection::open(&db_path)
            .map_err(|e| Error::EngineUnavailable(format!("{}: {e}", db_path.display())))?;
        tracing::info!(path = %db_path.display(), "catalog opened");
        Ok(Self { db_path, lock: tokio::sync::Mutex::new(()) })
    }

    #[cfg(not(feature = "duckdb"))]
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self, Error> {
        let db_path = db_path.into();
        Err(Error::EngineUnavailable(format!(
            "{}: built without the `duckdb` feature",
            db_path.display()
        )))
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    #[cfg(feature = "duckdb")]
    async fn execute(&self, sql: String) -> Result<(), Error> {
        let _guard = self.lock.lock().await;
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = duckdb::Connection::open(&db_path).map_err(|e| Error::RegistrationFailed(e.to_string()))?;
            conn.execute_batch(&sql).map_err(|e| Error::RegistrationFailed(e.to_string()))
        })
        .await
        .map_err(|e| Error::Internal(format!("catalog task failed: {e}")))?
    }

    #[cfg(not(feature = "duckdb"))]
    async fn execute(&self, _sql: String) -> Result<(), Error> {
        Err(Error::EngineUnavailable("built without the `duckdb` feature".to_string()))
    }
}

#[async_trait::async_trait]
impl CatalogRegistrar for DuckDbCatalog {
    async fn register(&self, name: &str, path: &Path) -> Result<(), Error> {
        let path = std::path::absolute(path).map_err(|e| Error::io(path, e))?;
        self.execute(create_view_sql(name, &path)).await?;
        tracing::info!(view = name, path = %path.display(), "view registered");
        Ok(())
    }

    async fn unregister(&self, name: &str) -> Result<(), Error> {
        self.execute(drop_view_sql(name)).await?;
        tracing::info!(view = name, "view dropped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoting() {
        assert_eq!(quote_ident("sales"), "\"sales\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(quote_literal("/data/o'brien.parquet"), "'/data/o''brien.parquet'");
    }

    #[test]
    fn test_view_sql() {
        assert_eq!(
            create_view_sql("sales", Path::new("/cache/tables/f1.parquet")),
            "CREATE OR REPLACE VIEW \"sales\" AS SELECT * FROM read_parquet('/cache/tables/f1.parquet')"
        );
        assert_eq!(drop_view_sql("sales"), "DROP VIEW IF EXISTS \"sales\"");
    }

    #[cfg(not(feature = "duckdb"))]
    #[test]
    fn test_open_without_engine() {
        let err = DuckDbCatalog::open("/tmp/catalog.duckdb").unwrap_err();
        assert!(matches!(err, Error::EngineUnavailable(_)));
    }

    #[cfg(feature = "duckdb")]
    mod duckdb_backed {
        use super::*;
        use crate::tabular::{TableMeta, write_table};
        use arrow::array::{ArrayRef, Int64Array};
        use arrow::datatypes::{DataType, Field, Schema};
        use arrow::record_batch::RecordBatch;
        use std::sync::Arc;

        fn write_parquet(path: &Path, values: Vec<i64>) {
            let schema = Schema::new(vec![Field::new("n", DataType::Int64, true)]);
            let column: ArrayRef = Arc::new(Int64Array::from(values));
            let batch = RecordBatch::try_new(Arc::new(schema), vec![column]).unwrap();
            let meta = TableMeta {
                source_id: "s".into(),
                table_name: "numbers".into(),
                original_name: "numbers.csv".into(),
                cached_at: "2026-01-01T00:00:00+00:00".into(),
            };
            write_table(&batch, &meta, std::fs::File::create(path).unwrap()).unwrap();
        }

        fn count(db: &Path, view: &str) -> duckdb::Result<i64> {
            let conn = duckdb::Connection::open(db)?;
            conn.query_row(&format!("SELECT count(*) FROM {}", quote_ident(view)), [], |row| row.get(0))
        }

        #[tokio::test]
        async fn test_register_query_unregister() {
            let dir = tempfile::tempdir().unwrap();
            let parquet = dir.path().join("it's numbers.parquet");
            write_parquet(&parquet, vec![1, 2, 3]);
            let catalog = DuckDbCatalog::open(dir.path().join("db/catalog.duckdb")).unwrap();

            catalog.register("numbers", &parquet).await.unwrap();
            assert_eq!(count(catalog.db_path(), "numbers").unwrap(), 3);

            write_parquet(&parquet, vec![1, 2, 3, 4]);
            catalog.register("numbers", &parquet).await.unwrap();
            assert_eq!(count(catalog.db_path(), "numbers").unwrap(), 4);

            catalog.unregister("numbers").await.unwrap();
            assert!(count(catalog.db_path(), "numbers").is_err());

            catalog.unregister("numbers").await.unwrap();
        }

        #[tokio::test]
        async fn test_concurrent_operations_do_not_conflict() {
            let dir = tempfile::tempdir().unwrap();
            let parquet = dir.path().join("t.parquet");
            write_parquet(&parquet, vec![7]);
            let catalog = Arc::new(DuckDbCatalog::open(dir.path().join("catalog.duckdb")).unwrap());

            let mut handles = Vec::new();
            for i in 0..8 {
                let catalog = Arc::clone(&catalog);
                let parquet = parquet.clone();
                handles.push(tokio::spawn(async move { catalog.register(&format!("t{i}"), &parquet).await }));
            }
            for handle in handles {
                handle.await.unwrap().unwrap();
            }
            assert_eq!(count(catalog.db_path(), "t5").unwrap(), 1);
        }
    }
}
