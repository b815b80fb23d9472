//! PDF previews keyed by content fingerprint.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use cairn_core::cache::{fingerprint_file, is_fingerprint};
use cairn_core::config::days;
use cairn_core::{ArtifactStore, Error, SourceRef};
use serde::Serialize;

use super::{Orchestrator, Phase, log_failure};
use crate::convert::{Converter, is_supported};

/// A committed preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewArtifact {
    /// Content fingerprint of the source, also the preview's file stem.
    pub key: String,
    pub path: PathBuf,
    /// Whether the preview was already in the store.
    pub cached: bool,
}

/// Result of asking for a preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewOutcome {
    Ready(PreviewArtifact),
    /// The source's extension is not convertible; nothing was done.
    Unsupported { extension: Option<String> },
}

impl Orchestrator {
    /// Return the PDF preview for `source`, converting it on a miss.
    ///
    /// Unsupported extensions are reported as [`PreviewOutcome::Unsupported`]
    /// without touching the source. Concurrent requests for identical content
    /// share one conversion.
    pub async fn get_or_build_preview(&self, source: &SourceRef, principal: &str) -> Result<PreviewOutcome, Error> {
        let extension = source.extension();
        let supported = extension.as_deref().is_some_and(|ext| is_supported(ext, &self.config.preview_extensions));
        if !supported {
            tracing::debug!(source_id = %source.id, extension = ?extension, "preview not supported");
            return Ok(PreviewOutcome::Unsupported { extension });
        }

        self.ensure_readable(&source.id, principal).await?;

        tracing::debug!(source_id = %source.id, phase = %Phase::Checking, "preview requested");
        let key = fingerprint_file(&source.path).await.map_err(|e| match e {
            Error::Io { source: io, .. } if io.kind() == std::io::ErrorKind::NotFound => {
                Error::NotFound(format!("source file {}", source.path.display()))
            }
            other => other,
        })?;

        if self.previews.exists(&key).await? {
            tracing::debug!(key = %key, phase = %Phase::HitServing, "preview cache hit");
            let path = self.previews.path_for(&key)?;
            return Ok(PreviewOutcome::Ready(PreviewArtifact { key, path, cached: true }));
        }

        let store = self.previews.clone();
        let converter = Arc::clone(&self.converter);
        let source_path = source.path.clone();
        let timeout = self.config.conversion_timeout();
        let flight_key = key.clone();
        let path = self
            .preview_flights
            .run(&key, move || async move {
                let result = build_preview(&store, converter.as_ref(), &source_path, &flight_key, timeout).await;
                if let Err(e) = &result {
                    log_failure(&flight_key, e);
                }
                result
            })
            .await?;

        Ok(PreviewOutcome::Ready(PreviewArtifact { key, path, cached: false }))
    }

    /// Bytes of the committed preview for `key`.
    ///
    /// The key must look like a fingerprint, which rules out path tricks
    /// before the store is consulted.
    pub async fn read_preview(&self, key: &str) -> Result<Vec<u8>, Error> {
        if !is_fingerprint(key) {
            return Err(Error::InvalidKey(format!("'{key}' is not a preview key")));
        }
        let path = self.previews.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::NotFound(format!("preview {key}"))),
            Err(e) => Err(Error::io(path, e)),
        }
    }

    /// Delete previews older than `max_age_days` (default from config).
    pub async fn sweep_previews(&self, max_age_days: Option<u64>) -> Result<u64, Error> {
        let age = max_age_days.map(days).unwrap_or_else(|| self.config.preview_max_age());
        self.sweep_previews_older_than(age).await
    }

    /// Delete previews last modified more than `age` ago.
    pub async fn sweep_previews_older_than(&self, age: Duration) -> Result<u64, Error> {
        self.previews.sweep(age).await
    }
}

async fn build_preview(
    store: &ArtifactStore, converter: &dyn Converter, source: &Path, key: &str, timeout: Duration,
) -> Result<PathBuf, Error> {
    // A flight that finished between our check and this one already committed.
    if store.exists(key).await? {
        tracing::debug!(key, phase = %Phase::HitServing, "preview committed by an earlier flight");
        return store.path_for(key);
    }

    tracing::info!(key, source = %source.display(), phase = %Phase::MissComputing, "converting");
    let scratch = store.scratch_dir().await?;
    let produced = converter.convert(source, scratch.path(), timeout).await?;

    tracing::debug!(key, phase = %Phase::Committing, "committing preview");
    let path = store.commit(key, &produced).await?;
    tracing::info!(key, path = %path.display(), phase = %Phase::Done, "preview ready");
    Ok(path)
}
