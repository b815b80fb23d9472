//! Tabular import: CSV and spreadsheet sources to normalized columnar tables.
//!
//! This module provides:
//! - Source kind detection from media type and display name
//! - Ordered text decoding for CSV ([`decode`])
//! - CSV and workbook parsing ([`csv`], [`sheet`])
//! - Column and table name normalization ([`naming`])
//! - Parquet persistence and inspection ([`columnar`])

use std::sync::Arc;

use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;
use cairn_core::{ColumnInfo, Error, TextEncoding};

pub mod columnar;
pub mod csv;
pub mod decode;
pub mod naming;
pub mod sheet;

#[cfg(test)]
pub(crate) mod fixtures;

pub use columnar::{TableMeta, read_descriptor, read_rows, type_label, write_table};
pub use naming::{normalize_column_name, table_name_for};

/// What kind of tabular source a document is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Csv,
    Spreadsheet,
}

/// Classify a source by media type, falling back to its display name.
///
/// CSV wins when both match; some clients label CSV files as Excel.
pub fn detect_kind(media_type: &str, display_name: &str) -> Result<SourceKind, Error> {
    let media = media_type.to_ascii_lowercase();
    let name = display_name.to_ascii_lowercase();

    if media.contains("csv") || name.ends_with(".csv") {
        return Ok(SourceKind::Csv);
    }
    let spreadsheet_media = media.contains("spreadsheet") || media.contains("ms-excel");
    let spreadsheet_name = [".xlsx", ".xlsm", ".xls", ".ods"].iter().any(|ext| name.ends_with(ext));
    if spreadsheet_media || spreadsheet_name {
        return Ok(SourceKind::Spreadsheet);
    }
    Err(Error::UnsupportedMediaType(format!("{media_type} ({display_name})")))
}

/// A parsed table ready to be written.
#[derive(Debug, Clone)]
pub struct ImportedTable {
    pub batch: RecordBatch,
    pub table_name: String,
    pub columns: Vec<ColumnInfo>,
    /// Encoding that decoded a CSV source; `None` for workbooks.
    pub encoding: Option<TextEncoding>,
}

impl ImportedTable {
    pub fn row_count(&self) -> usize {
        self.batch.num_rows()
    }
}

/// Parses tabular sources with a fixed encoding order.
#[derive(Debug, Clone)]
pub struct TabularEngine {
    encodings: Vec<TextEncoding>,
}

impl TabularEngine {
    pub fn new(encodings: Vec<TextEncoding>) -> Self {
        Self { encodings }
    }

    pub fn encodings(&self) -> &[TextEncoding] {
        &self.encodings
    }

    /// Parse `content` into a table with normalized column names.
    ///
    /// Fails with `UnsupportedMediaType` before looking at the bytes when the
    /// source is neither CSV nor a workbook.
    pub fn import(&self, content: &[u8], media_type: &str, display_name: &str) -> Result<ImportedTable, Error> {
        let kind = detect_kind(media_type, display_name)?;
        let (batch, encoding) = match kind {
            SourceKind::Csv => {
                let (text, encoding) = decode::decode_text(content, &self.encodings)?;
                (csv::parse_csv(&text)?, Some(encoding))
            }
            SourceKind::Spreadsheet => (sheet::parse_spreadsheet(content)?, None),
        };

        let batch = normalize_batch(&batch)?;
        let columns = columnar::columns_of(&batch.schema());
        tracing::debug!(
            display_name,
            kind = ?kind,
            encoding = encoding.map(|e| e.label()),
            rows = batch.num_rows(),
            columns = columns.len(),
            "parsed tabular source"
        );

        Ok(ImportedTable { batch, table_name: table_name_for(display_name), columns, encoding })
    }
}

/// Rename every column of `batch` to its normalized name.
pub fn normalize_batch(batch: &RecordBatch) -> Result<RecordBatch, Error> {
    let schema = batch.schema();
    let raw: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
    let names = naming::normalize_columns(&raw);
    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .zip(names)
        .map(|(f, name)| Field::new(name, f.data_type().clone(), f.is_nullable()))
        .collect();
    RecordBatch::try_new(Arc::new(Schema::new(fields)), batch.columns().to_vec())
        .map_err(|e| Error::ParseFailed(e.to_string()))
}
