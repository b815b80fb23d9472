//! Directory-backed artifact store.
//!
//! Each artifact lives at `<dir>/<key>.<ext>`. Writers produce a temporary
//! file (or scratch directory) inside the same directory and [`ArtifactStore::commit`]
//! renames it into place, so a reader never observes a partially written
//! artifact under its final name. Temporary entries start with a dot and are
//! invisible to `exists` and `keys`; `sweep` reclaims the ones a crashed
//! writer left behind once they are a day old.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tempfile::{NamedTempFile, TempDir};

use crate::Error;

/// Longest key accepted by the store.
const MAX_KEY_LEN: usize = 128;

const TEMP_PREFIX: &str = ".tmp-";
const SCRATCH_PREFIX: &str = ".scratch-";

/// Temp files and scratch dirs younger than this are assumed to belong to a
/// live writer and survive any sweep.
const STALE_LEFTOVER_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Content- or identifier-addressed store for derived files.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    ext: &'static str,
}

impl ArtifactStore {
    /// Create a store rooted at `dir` holding files with extension `ext`.
    ///
    /// The directory is created lazily on first write.
    pub fn new(dir: impl Into<PathBuf>, ext: &'static str) -> Self {
        Self { dir: dir.into(), ext }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ext(&self) -> &'static str {
        self.ext
    }

    /// Create the store directory if it is missing.
    pub async fn ensure_dir(&self) -> Result<(), Error> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| Error::io(&self.dir, e))
    }

    /// Location of the artifact for `key`, whether or not it exists.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, Error> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.{}", self.ext)))
    }

    /// Whether a committed artifact exists under `key`.
    pub async fn exists(&self, key: &str) -> Result<bool, Error> {
        let path = self.path_for(key)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::io(path, e)),
        }
    }

    /// Atomically move a fully written file at `temp` into place under `key`.
    ///
    /// `temp` must live on the same filesystem as the store; use
    /// [`ArtifactStore::temp_file`] or [`ArtifactStore::scratch_dir`] to get one.
    /// An existing artifact under `key` is replaced.
    pub async fn commit(&self, key: &str, temp: &Path) -> Result<PathBuf, Error> {
        let dest = self.path_for(key)?;
        self.ensure_dir().await?;
        tokio::fs::rename(temp, &dest).await.map_err(|e| Error::io(temp, e))?;
        tracing::debug!(key, path = %dest.display(), "artifact committed");
        Ok(dest)
    }

    /// Delete the artifact under `key`. Returns whether one existed.
    pub async fn remove(&self, key: &str) -> Result<bool, Error> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::io(path, e)),
        }
    }

    /// Delete artifacts last modified more than `max_age` ago.
    pub async fn sweep(&self, max_age: Duration) -> Result<u64, Error> {
        let cutoff = SystemTime::now().checked_sub(max_age).unwrap_or(SystemTime::UNIX_EPOCH);
        self.sweep_before(cutoff).await
    }

    /// Delete artifacts whose modification time is strictly before `cutoff`.
    ///
    /// An artifact modified exactly at `cutoff` is kept.
    pub async fn sweep_before(&self, cutoff: SystemTime) -> Result<u64, Error> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(Error::io(&self.dir, e)),
        };

        let leftover_cutoff =
            cutoff.min(SystemTime::now().checked_sub(STALE_LEFTOVER_AGE).unwrap_or(SystemTime::UNIX_EPOCH));
        let mut removed = 0u64;
        let mut reclaimed = 0u64;
        while let Some(entry) = entries.next_entry().await.map_err(|e| Error::io(&self.dir, e))? {
            let path = entry.path();
            if is_leftover(&path) {
                if self.reclaim_leftover(&path, leftover_cutoff).await? {
                    reclaimed += 1;
                }
                continue;
            }
            if self.key_of(&path).is_none() {
                continue;
            }
            let meta = match entry.metadata().await {
                Ok(meta) => meta,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(Error::io(path, e)),
            };
            if !meta.is_file() {
                continue;
            }
            let modified = meta.modified().map_err(|e| Error::io(&path, e))?;
            if modified < cutoff {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => removed += 1,
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(Error::io(path, e)),
                }
            }
        }

        tracing::info!(dir = %self.dir.display(), removed, reclaimed, "sweep finished");
        Ok(removed)
    }

    /// Delete a temp file or scratch directory left behind by a crashed writer.
    async fn reclaim_leftover(&self, path: &Path, cutoff: SystemTime) -> Result<bool, Error> {
        let meta = match tokio::fs::symlink_metadata(path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(Error::io(path, e)),
        };
        let modified = meta.modified().map_err(|e| Error::io(path, e))?;
        if modified >= cutoff {
            return Ok(false);
        }
        let result = if meta.is_dir() {
            tokio::fs::remove_dir_all(path).await
        } else {
            tokio::fs::remove_file(path).await
        };
        match result {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "reclaimed stale leftover");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::io(path, e)),
        }
    }

    /// Keys of all committed artifacts, sorted.
    pub async fn keys(&self) -> Result<Vec<String>, Error> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::io(&self.dir, e)),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| Error::io(&self.dir, e))? {
            if let Some(key) = self.key_of(&entry.path()) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }

    /// A scoped scratch directory inside the store, removed on drop.
    pub async fn scratch_dir(&self) -> Result<TempDir, Error> {
        self.ensure_dir().await?;
        tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(&self.dir)
            .map_err(|e| Error::io(&self.dir, e))
    }

    /// A temporary file inside the store, removed on drop unless committed.
    pub async fn temp_file(&self) -> Result<NamedTempFile, Error> {
        self.ensure_dir().await?;
        tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(".partial")
            .tempfile_in(&self.dir)
            .map_err(|e| Error::io(&self.dir, e))
    }

    fn key_of(&self, path: &Path) -> Option<String> {
        if path.extension().and_then(|e| e.to_str()) != Some(self.ext) {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        validate_key(stem).ok()?;
        Some(stem.to_string())
    }
}

fn is_leftover(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(TEMP_PREFIX) || n.starts_with(SCRATCH_PREFIX))
}

/// Reject keys that could escape the store directory or collide with temp files.
pub fn validate_key(key: &str) -> Result<(), Error> {
    if key.is_empty() || key.len() > MAX_KEY_LEN {
        return Err(Error::InvalidKey(format!("key must be 1-{MAX_KEY_LEN} characters")));
    }
    if !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(Error::InvalidKey(format!("'{key}' may only contain ASCII letters, digits, '-' and '_'")));
    }
    Ok(())
}
