//! Content fingerprints used as preview cache keys.
//!
//! A fingerprint is the first 16 hex characters of the SHA-256 digest of the
//! source bytes. Input is streamed in fixed-size chunks so memory stays bounded
//! regardless of file size.

use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::Error;

/// Length of a fingerprint in hex characters.
pub const FINGERPRINT_LEN: usize = 16;

/// Read size used by [`fingerprint`].
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Fingerprint a stream using the default chunk size.
pub async fn fingerprint<R: AsyncRead + Unpin>(reader: R) -> std::io::Result<String> {
    fingerprint_with_chunk_size(reader, DEFAULT_CHUNK_SIZE).await
}

/// Fingerprint a stream, reading at most `chunk_size` bytes at a time.
pub async fn fingerprint_with_chunk_size<R: AsyncRead + Unpin>(
    mut reader: R, chunk_size: usize,
) -> std::io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; chunk_size.max(1)];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(truncate(hasher.finalize().as_slice()))
}

/// Fingerprint a file on disk.
pub async fn fingerprint_file(path: &Path) -> Result<String, Error> {
    let file = tokio::fs::File::open(path).await.map_err(|e| Error::io(path, e))?;
    fingerprint(file).await.map_err(|e| Error::io(path, e))
}

/// Fingerprint an in-memory buffer.
pub fn fingerprint_bytes(bytes: &[u8]) -> String {
    truncate(Sha256::digest(bytes).as_slice())
}

/// Whether `s` has the shape of a fingerprint.
pub fn is_fingerprint(s: &str) -> bool {
    s.len() == FINGERPRINT_LEN && s.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'))
}

fn truncate(digest: &[u8]) -> String {
    let mut hex = hex::encode(digest);
    hex.truncate(FINGERPRINT_LEN);
    hex
}
