//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (CAIRN_*)
//! 2. TOML config file (if CAIRN_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! All cache locations hang off `base_dir`; nothing is process-global.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Text encodings tried, in order, when decoding CSV bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextEncoding {
    #[serde(rename = "utf-8", alias = "utf8")]
    Utf8,
    #[serde(rename = "latin-1", alias = "latin1", alias = "iso-8859-1")]
    Latin1,
    #[serde(rename = "windows-1252", alias = "cp1252")]
    Windows1252,
}

impl TextEncoding {
    pub fn label(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Latin1 => "latin-1",
            TextEncoding::Windows1252 => "windows-1252",
        }
    }
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (CAIRN_*)
/// 2. TOML config file (if CAIRN_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Root of all persisted state (previews, tables, catalog).
    ///
    /// Set via CAIRN_BASE_DIR environment variable.
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,

    /// Converter executable, invoked in headless convert-to-pdf mode.
    ///
    /// Set via CAIRN_CONVERTER_BIN environment variable.
    #[serde(default = "default_converter_bin")]
    pub converter_bin: String,

    /// Conversion subprocess timeout in milliseconds.
    ///
    /// Set via CAIRN_CONVERSION_TIMEOUT_MS environment variable.
    #[serde(default = "default_conversion_timeout_ms")]
    pub conversion_timeout_ms: u64,

    /// Default age threshold for preview sweeps.
    ///
    /// Set via CAIRN_PREVIEW_MAX_AGE_DAYS environment variable.
    #[serde(default = "default_preview_max_age_days")]
    pub preview_max_age_days: u64,

    /// File extensions accepted for PDF preview (lowercase, no dot).
    #[serde(default = "default_preview_extensions")]
    pub preview_extensions: Vec<String>,

    /// Encodings tried in order when decoding CSV sources.
    #[serde(default = "default_csv_encodings")]
    pub csv_encodings: Vec<TextEncoding>,

    /// Row count returned by table previews when the caller gives none.
    #[serde(default = "default_preview_row_limit")]
    pub preview_row_limit: usize,

    /// Upper bound on rows a single table preview may return.
    #[serde(default = "default_max_preview_rows")]
    pub max_preview_rows: usize,

    /// Root directory served by the filesystem document store.
    ///
    /// Set via CAIRN_DOCUMENTS_ROOT environment variable.
    #[serde(default = "default_documents_root")]
    pub documents_root: PathBuf,
}

fn default_base_dir() -> PathBuf {
    PathBuf::from("./cairn-cache")
}

fn default_converter_bin() -> String {
    "soffice".into()
}

fn default_conversion_timeout_ms() -> u64 {
    60_000
}

fn default_preview_max_age_days() -> u64 {
    7
}

fn default_preview_extensions() -> Vec<String> {
    ["doc", "docx", "odt", "rtf", "xls", "xlsx", "ods", "csv", "ppt", "pptx", "odp"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_csv_encodings() -> Vec<TextEncoding> {
    vec![TextEncoding::Utf8, TextEncoding::Latin1, TextEncoding::Windows1252]
}

fn default_preview_row_limit() -> usize {
    100
}

fn default_max_preview_rows() -> usize {
    10_000
}

fn default_documents_root() -> PathBuf {
    PathBuf::from("./documents")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            converter_bin: default_converter_bin(),
            conversion_timeout_ms: default_conversion_timeout_ms(),
            preview_max_age_days: default_preview_max_age_days(),
            preview_extensions: default_preview_extensions(),
            csv_encodings: default_csv_encodings(),
            preview_row_limit: default_preview_row_limit(),
            max_preview_rows: default_max_preview_rows(),
            documents_root: default_documents_root(),
        }
    }
}

impl AppConfig {
    /// Conversion timeout as Duration for use with tokio.
    pub fn conversion_timeout(&self) -> Duration {
        Duration::from_millis(self.conversion_timeout_ms)
    }

    /// Default sweep age as Duration.
    pub fn preview_max_age(&self) -> Duration {
        days(self.preview_max_age_days)
    }

    /// Directory holding PDF previews keyed by fingerprint.
    pub fn previews_dir(&self) -> PathBuf {
        self.base_dir.join("previews")
    }

    /// Directory holding Parquet tables keyed by source id.
    pub fn tables_dir(&self) -> PathBuf {
        self.base_dir.join("tables")
    }

    /// DuckDB catalog database file.
    pub fn catalog_path(&self) -> PathBuf {
        self.base_dir.join("catalog.duckdb")
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `CAIRN_`
    /// 2. TOML file from `CAIRN_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let file = std::env::var_os("CAIRN_CONFIG_FILE").map(PathBuf::from);
        Self::load_from(file.as_deref())
    }

    /// Like [`AppConfig::load`], but with an explicit TOML file in place of
    /// `CAIRN_CONFIG_FILE`.
    pub fn load_from(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_path) = file {
            figment = figment.merge(Toml::file(config_path));
        }

        figment = figment.merge(
            Env::prefixed("CAIRN_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

/// Whole days as a Duration, saturating at `u64::MAX` seconds.
pub fn days(n: u64) -> Duration {
    Duration::from_secs(n.saturating_mul(24 * 60 * 60))
}
