//! CSV text to a record batch, with column types inferred from the data.

use std::io::Cursor;
use std::sync::Arc;

use arrow::compute::concat_batches;
use arrow::csv::ReaderBuilder;
use arrow::csv::reader::Format;
use arrow::record_batch::RecordBatch;
use cairn_core::Error;

/// Parse decoded CSV text whose first line is the header row.
pub fn parse_csv(text: &str) -> Result<RecordBatch, Error> {
    if text.trim().is_empty() {
        return Err(Error::ParseFailed("CSV has no header row".to_string()));
    }

    let format = Format::default().with_header(true);
    let (schema, _) = format
        .infer_schema(Cursor::new(text.as_bytes()), None)
        .map_err(|e| Error::ParseFailed(format!("schema inference failed: {e}")))?;
    let schema = Arc::new(schema);

    let reader = ReaderBuilder::new(Arc::clone(&schema))
        .with_header(true)
        .build(Cursor::new(text.as_bytes()))
        .map_err(|e| Error::ParseFailed(e.to_string()))?;
    let batches = reader
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| Error::ParseFailed(e.to_string()))?;

    concat_batches(&schema, &batches).map_err(|e| Error::ParseFailed(e.to_string()))
}
