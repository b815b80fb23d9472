//! Parquet persistence for imported tables.
//!
//! The file carries the import's identity (source id, table name, original
//! name, import time) in its key/value metadata, so a descriptor can always be
//! rebuilt from the file alone.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use arrow::datatypes::{DataType, Schema};
use arrow::json::WriterBuilder;
use arrow::json::writer::JsonArray;
use arrow::record_batch::RecordBatch;
use cairn_core::{ColumnInfo, Error, TableDescriptor, format_size};
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::file::metadata::KeyValue;
use parquet::file::properties::WriterProperties;
use serde_json::{Map, Value};

const META_SOURCE_ID: &str = "cairn.source_id";
const META_TABLE_NAME: &str = "cairn.table_name";
const META_ORIGINAL_NAME: &str = "cairn.original_name";
const META_CACHED_AT: &str = "cairn.cached_at";

/// Identity written alongside the data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMeta {
    pub source_id: String,
    pub table_name: String,
    pub original_name: String,
    pub cached_at: String,
}

impl TableMeta {
    fn to_key_values(&self) -> Vec<KeyValue> {
        vec![
            KeyValue::new(META_SOURCE_ID.to_string(), self.source_id.clone()),
            KeyValue::new(META_TABLE_NAME.to_string(), self.table_name.clone()),
            KeyValue::new(META_ORIGINAL_NAME.to_string(), self.original_name.clone()),
            KeyValue::new(META_CACHED_AT.to_string(), self.cached_at.clone()),
        ]
    }

    fn from_key_values(pairs: &[KeyValue]) -> Result<Self, Error> {
        let get = |key: &str| {
            pairs
                .iter()
                .find(|kv| kv.key == key)
                .and_then(|kv| kv.value.clone())
                .ok_or_else(|| Error::Columnar(format!("file metadata is missing '{key}'")))
        };
        Ok(Self {
            source_id: get(META_SOURCE_ID)?,
            table_name: get(META_TABLE_NAME)?,
            original_name: get(META_ORIGINAL_NAME)?,
            cached_at: get(META_CACHED_AT)?,
        })
    }
}

fn columnar_err(e: impl std::fmt::Display) -> Error {
    Error::Columnar(e.to_string())
}

/// Write `batch` as a single Snappy-compressed Parquet file.
pub fn write_table<W: Write + Send>(batch: &RecordBatch, meta: &TableMeta, writer: W) -> Result<(), Error> {
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .set_key_value_metadata(Some(meta.to_key_values()))
        .build();
    let mut writer = ArrowWriter::try_new(writer, batch.schema(), Some(props)).map_err(columnar_err)?;
    writer.write(batch).map_err(columnar_err)?;
    writer.close().map_err(columnar_err)?;
    Ok(())
}

fn open(path: &Path) -> Result<ParquetRecordBatchReaderBuilder<File>, Error> {
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::NotFound(format!("cached table {}", path.display())),
        _ => Error::io(path, e),
    })?;
    ParquetRecordBatchReaderBuilder::try_new(file).map_err(columnar_err)
}

/// Column list for an Arrow schema.
pub fn columns_of(schema: &Schema) -> Vec<ColumnInfo> {
    schema
        .fields()
        .iter()
        .map(|f| ColumnInfo::new(f.name(), type_label(f.data_type())))
        .collect()
}

/// Rebuild the descriptor of a cached table by inspecting the file.
pub fn read_descriptor(path: &Path) -> Result<TableDescriptor, Error> {
    let builder = open(path)?;
    let file_meta = builder.metadata().file_metadata();
    let meta = TableMeta::from_key_values(file_meta.key_value_metadata().map(Vec::as_slice).unwrap_or_default())?;
    let row_count = u64::try_from(file_meta.num_rows()).unwrap_or_default();
    let columns = columns_of(builder.schema());
    let size_bytes = std::fs::metadata(path).map_err(|e| Error::io(path, e))?.len();

    Ok(TableDescriptor {
        source_id: meta.source_id,
        table_name: meta.table_name,
        original_name: meta.original_name,
        columns,
        row_count,
        path: path.to_path_buf(),
        cached_at: meta.cached_at,
        size_bytes,
        size: format_size(size_bytes),
        catalog_error: None,
    })
}

/// First `limit` rows as JSON objects keyed by column name, in column order.
///
/// Nulls are kept as explicit `null` values.
pub fn read_rows(path: &Path, limit: usize) -> Result<Vec<Map<String, Value>>, Error> {
    let builder = open(path)?;
    if limit == 0 {
        return Ok(Vec::new());
    }
    let reader = builder.with_limit(limit).build().map_err(columnar_err)?;
    let batches = reader.collect::<Result<Vec<_>, _>>().map_err(columnar_err)?;
    if batches.iter().all(|b| b.num_rows() == 0) {
        return Ok(Vec::new());
    }

    let mut writer = WriterBuilder::new().with_explicit_nulls(true).build::<_, JsonArray>(Vec::new());
    let refs: Vec<&RecordBatch> = batches.iter().collect();
    writer.write_batches(&refs).map_err(columnar_err)?;
    writer.finish().map_err(columnar_err)?;
    let buf = writer.into_inner();

    let mut rows: Vec<Map<String, Value>> = serde_json::from_slice(&buf).map_err(columnar_err)?;
    rows.truncate(limit);
    Ok(rows)
}

/// Short, stable label for a column type.
pub fn type_label(data_type: &DataType) -> String {
    match data_type {
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => "int64".to_string(),
        DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => "uint64".to_string(),
        DataType::Float16 | DataType::Float32 | DataType::Float64 => "float64".to_string(),
        DataType::Boolean => "bool".to_string(),
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => "string".to_string(),
        DataType::Date32 | DataType::Date64 => "date".to_string(),
        DataType::Timestamp(_, _) => "timestamp".to_string(),
        DataType::Null => "null".to_string(),
        other => other.to_string().to_lowercase(),
    }
}
