//! Source documents and the document-store contract.
//!
//! The cache never owns source documents. It asks a [`DocumentStore`] for
//! bytes, metadata and permission decisions, and works from the
//! [`SourceRef`] that comes back.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::Error;

/// A source document as seen by one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SourceRef {
    /// Stable identifier in the document store.
    pub id: String,
    /// Absolute location of the bytes on disk.
    pub path: PathBuf,
    /// Declared media type, e.g. `text/csv`.
    pub media_type: String,
    /// Human-facing file name, usually with an extension.
    pub display_name: String,
}

impl SourceRef {
    /// Lowercased extension of the display name, falling back to the path.
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.display_name).or_else(|| self.path.to_str().and_then(extension_of))
    }
}

/// Lowercased text after the last dot of `name`, if any.
pub fn extension_of(name: &str) -> Option<String> {
    let file_name = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Metadata the document store keeps for a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMetadata {
    pub title: String,
    pub media_type: String,
    pub path: PathBuf,
}

/// What the caller intends to do with a source. The cache only ever reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
}

/// External collaborator that owns source documents.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Current bytes of the source.
    async fn get_content(&self, id: &str) -> Result<Vec<u8>, Error>;

    /// Title, media type and on-disk path of the source.
    async fn get_metadata(&self, id: &str) -> Result<SourceMetadata, Error>;

    /// Whether `principal` may perform `action` on the source.
    async fn check_permission(&self, id: &str, action: Action, principal: &str) -> Result<bool, Error>;

    /// Build a [`SourceRef`] from the store's metadata.
    async fn resolve(&self, id: &str) -> Result<SourceRef, Error> {
        let meta = self.get_metadata(id).await?;
        Ok(SourceRef { id: id.to_string(), path: meta.path, media_type: meta.media_type, display_name: meta.title })
    }
}

/// Document store backed by a directory tree.
///
/// Ids are `/`-separated paths relative to the root. Every principal may read
/// every file under the root; ids that point outside it are denied.
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve_path(&self, id: &str) -> Result<PathBuf, Error> {
        let rel = Path::new(id);
        let escapes = id.is_empty()
            || rel
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(Error::PermissionDenied(format!("'{id}' is outside the document root")));
        }
        Ok(self.root.join(rel))
    }

    async fn existing_file(&self, id: &str) -> Result<PathBuf, Error> {
        let path = self.resolve_path(id)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            Ok(_) => Err(Error::NotFound(format!("'{id}' is not a file"))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::NotFound(format!("source '{id}'"))),
            Err(e) => Err(Error::io(path, e)),
        }
    }
}

#[async_trait::async_trait]
impl DocumentStore for FsDocumentStore {
    async fn get_content(&self, id: &str) -> Result<Vec<u8>, Error> {
        let path = self.existing_file(id).await?;
        tokio::fs::read(&path).await.map_err(|e| Error::io(path, e))
    }

    async fn get_metadata(&self, id: &str) -> Result<SourceMetadata, Error> {
        let path = self.existing_file(id).await?;
        let title = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(id)
            .to_string();
        let media_type = media_type_for(&title).to_string();
        let path = std::path::absolute(&path).map_err(|e| Error::io(&path, e))?;
        Ok(SourceMetadata { title, media_type, path })
    }

    async fn check_permission(&self, id: &str, _action: Action, _principal: &str) -> Result<bool, Error> {
        Ok(self.resolve_path(id).is_ok())
    }
}

/// Media type for a file name, by extension.
pub fn media_type_for(name: &str) -> &'static str {
    match extension_of(name).as_deref() {
        Some("csv") => "text/csv",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("xls") => "application/vnd.ms-excel",
        Some("ods") => "application/vnd.oasis.opendocument.spreadsheet",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        Some("doc") => "application/msword",
        Some("odt") => "application/vnd.oasis.opendocument.text",
        Some("rtf") => "application/rtf",
        Some("pptx") => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        Some("ppt") => "application/vnd.ms-powerpoint",
        Some("odp") => "application/vnd.oasis.opendocument.presentation",
        Some("pdf") => "application/pdf",
        Some("zip") => "application/zip",
        _ => "application/octet-stream",
    }
}
