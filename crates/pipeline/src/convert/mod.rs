//! Document-to-PDF conversion through an external office suite.
//!
//! The converter runs `soffice --headless --convert-to pdf --outdir <dir> <src>`
//! under a timeout and reports the produced `<stem>.pdf`. Each invocation gets
//! its own LibreOffice user profile inside the scratch directory; two
//! processes sharing a profile refuse to run side by side.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use cairn_core::Error;
use tokio::process::Command;
use url::Url;

/// Extensions accepted for preview unless configuration says otherwise.
pub const SUPPORTED_EXTENSIONS: &[&str] =
    &["doc", "docx", "odt", "rtf", "xls", "xlsx", "ods", "csv", "ppt", "pptx", "odp"];

/// Longest stderr excerpt carried in a conversion error.
const STDERR_EXCERPT: usize = 2048;

/// Whether `ext` (lowercase, no dot) is in `allowed`.
pub fn is_supported(ext: &str, allowed: &[String]) -> bool {
    allowed.iter().any(|a| a.eq_ignore_ascii_case(ext))
}

/// Converts a source document into a PDF inside a scratch directory.
#[async_trait::async_trait]
pub trait Converter: Send + Sync {
    /// Convert `source` and return the path of the produced PDF.
    ///
    /// The output lands in `scratch_dir`; the caller owns its lifetime.
    async fn convert(&self, source: &Path, scratch_dir: &Path, timeout: Duration) -> Result<PathBuf, Error>;
}

/// LibreOffice (or compatible) command-line converter.
#[derive(Debug, Clone)]
pub struct SofficeConverter {
    program: PathBuf,
}

impl SofficeConverter {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into() }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(&self, source: &Path, scratch_dir: &Path) -> Result<Command, Error> {
        let mut cmd = Command::new(&self.program);
        cmd.arg(format!("-env:UserInstallation={}", profile_url(scratch_dir)?))
            .arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(scratch_dir)
            .arg(source)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        Ok(cmd)
    }
}

/// `file:` URL of the per-conversion profile directory, percent-encoded.
pub fn profile_url(scratch_dir: &Path) -> Result<Url, Error> {
    let profile = std::path::absolute(scratch_dir.join("profile")).map_err(|e| Error::io(scratch_dir, e))?;
    Url::from_file_path(&profile)
        .map_err(|()| Error::Internal(format!("{} cannot be expressed as a file URL", profile.display())))
}

/// Name of the PDF the converter writes for `source`.
pub fn expected_output(source: &Path, scratch_dir: &Path) -> PathBuf {
    let stem = source.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    scratch_dir.join(format!("{stem}.pdf"))
}

#[async_trait::async_trait]
impl Converter for SofficeConverter {
    async fn convert(&self, source: &Path, scratch_dir: &Path, timeout: Duration) -> Result<PathBuf, Error> {
        let start = Instant::now();
        let child = self.command(source, scratch_dir)?.spawn().map_err(|e| Error::ConversionFailed {
            stderr: format!("failed to launch {}: {e}", self.program.display()),
        })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(Error::io(&self.program, e)),
            Err(_) => {
                tracing::warn!(source = %source.display(), timeout_ms = timeout.as_millis() as u64, "converter timed out");
                return Err(Error::ConversionTimeout(timeout.as_millis() as u64));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = excerpt(stderr.trim(), STDERR_EXCERPT);
            tracing::warn!(
                source = %source.display(),
                status = %output.status,
                stdout = %String::from_utf8_lossy(&output.stdout).trim(),
                stderr = %stderr,
                "converter failed"
            );
            let stderr = if stderr.is_empty() { format!("converter exited with {}", output.status) } else { stderr };
            return Err(Error::ConversionFailed { stderr });
        }

        let produced = expected_output(source, scratch_dir);
        match tokio::fs::metadata(&produced).await {
            Ok(meta) if meta.is_file() => {}
            _ => {
                let name = produced.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
                return Err(Error::ConversionIncomplete(name));
            }
        }

        tracing::debug!(
            source = %source.display(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "conversion finished"
        );
        Ok(produced)
    }
}

fn excerpt(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
