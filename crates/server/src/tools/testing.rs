//! Test fixtures for tool implementations.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rmcp::model::CallToolResult;
use serde::de::DeserializeOwned;
use tempfile::TempDir;

use cairn_core::{AppConfig, Error, FsDocumentStore};
use cairn_pipeline::{CatalogRegistrar, Orchestrator, SofficeConverter};

/// Catalog that only remembers view names.
#[derive(Default)]
pub struct MemoryCatalog {
    pub views: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl CatalogRegistrar for MemoryCatalog {
    async fn register(&self, name: &str, _path: &Path) -> Result<(), Error> {
        let mut views = self.views.lock().unwrap();
        if !views.iter().any(|v| v == name) {
            views.push(name.to_string());
        }
        Ok(())
    }

    async fn unregister(&self, name: &str) -> Result<(), Error> {
        self.views.lock().unwrap().retain(|v| v != name);
        Ok(())
    }
}

/// An orchestrator over a temp directory with a filesystem document store.
pub struct TestServer {
    pub dir: TempDir,
    pub orchestrator: Orchestrator,
    pub catalog: Arc<MemoryCatalog>,
}

impl TestServer {
    /// Converter points at a binary that does not exist.
    pub fn new() -> Self {
        Self::build(|dir| dir.join("no-such-soffice"))
    }

    /// Converter is a shell script that writes a stub PDF.
    #[cfg(unix)]
    pub fn with_script_converter() -> Self {
        use std::os::unix::fs::PermissionsExt;

        Self::build(|dir| {
            let script = dir.join("fake-soffice");
            let body = r#"#!/bin/sh
out=""; src=""
while [ $# -gt 0 ]; do
  case "$1" in
    --outdir) out="$2"; shift 2 ;;
    --convert-to) shift 2 ;;
    -*) shift ;;
    *) src="$1"; shift ;;
  esac
done
name=$(basename "$src")
printf '%%PDF-1.4 stub' > "$out/${name%.*}.pdf"
"#;
            std::fs::write(&script, body).unwrap();
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
            script
        })
    }

    fn build(converter: impl FnOnce(&Path) -> PathBuf) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            base_dir: dir.path().join("cache"),
            documents_root: dir.path().join("docs"),
            ..AppConfig::default()
        };
        std::fs::create_dir_all(&config.documents_root).unwrap();

        let catalog = Arc::new(MemoryCatalog::default());
        let orchestrator = Orchestrator::new(
            config.clone(),
            Arc::new(FsDocumentStore::new(&config.documents_root)),
            Arc::new(SofficeConverter::new(converter(dir.path()))),
            Arc::clone(&catalog) as Arc<dyn CatalogRegistrar>,
        );
        Self { dir, orchestrator, catalog }
    }

    /// Write a document under the document root; its id is `name`.
    pub fn write_doc(&self, name: &str, bytes: &[u8]) {
        std::fs::write(self.orchestrator.config().documents_root.join(name), bytes).unwrap();
    }
}

/// Parse the JSON text content of a successful tool result.
pub fn output_json<T: DeserializeOwned>(result: CallToolResult) -> T {
    let content_val = serde_json::to_value(&result.content[0]).unwrap();
    let text = content_val
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}
