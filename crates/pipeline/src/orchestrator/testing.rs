//! In-memory collaborators for orchestrator tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cairn_core::source::media_type_for;
use cairn_core::{Action, AppConfig, DocumentStore, Error, SourceMetadata, SourceRef};
use tempfile::TempDir;

use super::Orchestrator;
use crate::catalog::CatalogRegistrar;
use crate::convert::{Converter, expected_output};

/// Converter that writes a tiny PDF after an optional delay.
#[derive(Default)]
pub struct FakeConverter {
    pub calls: AtomicUsize,
    delay: Duration,
    fail_first: AtomicBool,
}

impl FakeConverter {
    pub fn instant() -> Self {
        Self::default()
    }

    pub fn slow(delay: Duration) -> Self {
        Self { delay, ..Self::default() }
    }

    /// Fails its first call, then succeeds.
    pub fn failing_first(delay: Duration) -> Self {
        Self { delay, fail_first: AtomicBool::new(true), ..Self::default() }
    }
}

#[async_trait::async_trait]
impl Converter for FakeConverter {
    async fn convert(&self, source: &Path, scratch_dir: &Path, _timeout: Duration) -> Result<PathBuf, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if self.fail_first.swap(false, Ordering::SeqCst) {
            return Err(Error::ConversionFailed { stderr: "source file could not be loaded".into() });
        }
        let out = expected_output(source, scratch_dir);
        let mut pdf = b"%PDF-1.4\n".to_vec();
        pdf.extend(tokio::fs::read(source).await.map_err(|e| Error::io(source, e))?);
        tokio::fs::write(&out, pdf).await.map_err(|e| Error::io(&out, e))?;
        Ok(out)
    }
}

/// Catalog that records live views in memory.
#[derive(Default)]
pub struct RecordingCatalog {
    views: Mutex<BTreeMap<String, PathBuf>>,
    fail_register: AtomicBool,
}

impl RecordingCatalog {
    pub fn live_views(&self) -> Vec<(String, PathBuf)> {
        self.views.lock().unwrap().iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    pub fn fail_register(&self, fail: bool) {
        self.fail_register.store(fail, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl CatalogRegistrar for RecordingCatalog {
    async fn register(&self, name: &str, path: &Path) -> Result<(), Error> {
        if self.fail_register.load(Ordering::SeqCst) {
            return Err(Error::RegistrationFailed("catalog is read-only".into()));
        }
        self.views.lock().unwrap().insert(name.to_string(), path.to_path_buf());
        Ok(())
    }

    async fn unregister(&self, name: &str) -> Result<(), Error> {
        self.views.lock().unwrap().remove(name);
        Ok(())
    }
}

/// Document store over files in a temp directory, with per-id denials.
#[derive(Default)]
pub struct MemoryDocuments {
    docs: Mutex<HashMap<String, SourceMetadata>>,
    denied: Mutex<HashSet<String>>,
    delay: Mutex<Duration>,
    pub content_calls: AtomicUsize,
}

impl MemoryDocuments {
    pub fn deny(&self, id: &str) {
        self.denied.lock().unwrap().insert(id.to_string());
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    fn meta(&self, id: &str) -> Result<SourceMetadata, Error> {
        self.docs
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("source '{id}'")))
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryDocuments {
    async fn get_content(&self, id: &str) -> Result<Vec<u8>, Error> {
        self.content_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        tokio::time::sleep(delay).await;
        let meta = self.meta(id)?;
        tokio::fs::read(&meta.path).await.map_err(|e| Error::io(&meta.path, e))
    }

    async fn get_metadata(&self, id: &str) -> Result<SourceMetadata, Error> {
        self.meta(id)
    }

    async fn check_permission(&self, id: &str, _action: Action, _principal: &str) -> Result<bool, Error> {
        Ok(!self.denied.lock().unwrap().contains(id))
    }
}

/// An orchestrator wired to fakes, rooted in a temp directory.
pub struct Harness {
    pub dir: TempDir,
    pub orchestrator: Orchestrator,
    pub converter: Arc<FakeConverter>,
    pub catalog: Arc<RecordingCatalog>,
    pub documents: Arc<MemoryDocuments>,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(FakeConverter::instant(), |_| {})
    }

    pub fn with_converter(converter: FakeConverter) -> Self {
        Self::build(converter, |_| {})
    }

    pub fn with_config(tweak: impl FnOnce(&mut AppConfig)) -> Self {
        Self::build(FakeConverter::instant(), tweak)
    }

    fn build(converter: FakeConverter, tweak: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig {
            base_dir: dir.path().join("cache"),
            documents_root: dir.path().join("docs"),
            ..AppConfig::default()
        };
        tweak(&mut config);

        let converter = Arc::new(converter);
        let catalog = Arc::new(RecordingCatalog::default());
        let documents = Arc::new(MemoryDocuments::default());
        let orchestrator = Orchestrator::new(
            config,
            Arc::clone(&documents) as Arc<dyn DocumentStore>,
            Arc::clone(&converter) as Arc<dyn Converter>,
            Arc::clone(&catalog) as Arc<dyn CatalogRegistrar>,
        );
        Self { dir, orchestrator, converter, catalog, documents }
    }

    /// Register a document, guessing its media type from the name.
    pub fn add_doc(&self, id: &str, name: &str, bytes: &[u8]) -> SourceRef {
        self.add_doc_typed(id, name, media_type_for(name), bytes)
    }

    pub fn add_doc_typed(&self, id: &str, name: &str, media_type: &str, bytes: &[u8]) -> SourceRef {
        let dir = self.dir.path().join("docs").join(id);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, bytes).unwrap();
        let meta = SourceMetadata { title: name.to_string(), media_type: media_type.to_string(), path: path.clone() };
        self.documents.docs.lock().unwrap().insert(id.to_string(), meta);
        SourceRef { id: id.to_string(), path, media_type: media_type.to_string(), display_name: name.to_string() }
    }

    /// Replace a document's content and name, as a rename plus edit would.
    pub fn update_doc(&self, id: &str, name: &str, bytes: &[u8]) -> SourceRef {
        self.add_doc(id, name, bytes)
    }
}
