//! Spreadsheet workbooks (xlsx, xls, ods) to a record batch.
//!
//! Only the first worksheet is read. Its first used row is the header; the
//! type of each column is inferred from the cells below it.

use std::io::Cursor;
use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray, TimestampMillisecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use cairn_core::Error;
use calamine::{Data, Range, Reader, open_workbook_auto_from_rs};
use chrono::{NaiveDate, NaiveDateTime};

/// Largest magnitude at which every integer is exactly representable as f64.
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

/// Parse the first worksheet of a workbook.
pub fn parse_spreadsheet(bytes: &[u8]) -> Result<RecordBatch, Error> {
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|e| Error::ParseFailed(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::ParseFailed("workbook has no worksheets".to_string()))?
        .map_err(|e| Error::ParseFailed(e.to_string()))?;
    range_to_batch(&range)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Empty,
    Int,
    Float,
    Bool,
    Timestamp,
    Text,
}

impl Kind {
    fn of(cell: &Data) -> Kind {
        match cell {
            Data::Empty | Data::Error(_) => Kind::Empty,
            Data::Int(_) => Kind::Int,
            Data::Float(f) if f.fract() == 0.0 && f.abs() < MAX_EXACT_INT => Kind::Int,
            Data::Float(_) => Kind::Float,
            Data::Bool(_) => Kind::Bool,
            Data::DateTime(_) | Data::DateTimeIso(_) if naive_datetime(cell).is_some() => Kind::Timestamp,
            _ => Kind::Text,
        }
    }

    fn merge(self, other: Kind) -> Kind {
        match (self, other) {
            (Kind::Empty, k) | (k, Kind::Empty) => k,
            (a, b) if a == b => a,
            (Kind::Int, Kind::Float) | (Kind::Float, Kind::Int) => Kind::Float,
            _ => Kind::Text,
        }
    }
}

/// Convert a cell range into a batch, treating the first row as the header.
pub fn range_to_batch(range: &Range<Data>) -> Result<RecordBatch, Error> {
    let mut rows = range.rows();
    let header = rows.next().ok_or_else(|| Error::ParseFailed("worksheet is empty".to_string()))?;
    let body: Vec<&[Data]> = rows.collect();

    let mut fields = Vec::with_capacity(header.len());
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(header.len());
    for (i, head) in header.iter().enumerate() {
        let name = match head {
            Data::Empty => format!("Unnamed: {i}"),
            other => other.to_string(),
        };
        let cells: Vec<&Data> = body.iter().map(|row| row.get(i).unwrap_or(&Data::Empty)).collect();
        let (data_type, array) = build_column(&cells);
        fields.push(Field::new(name, data_type, true));
        columns.push(array);
    }

    let options = RecordBatchOptions::new().with_row_count(Some(body.len()));
    RecordBatch::try_new_with_options(Arc::new(Schema::new(fields)), columns, &options)
        .map_err(|e| Error::ParseFailed(e.to_string()))
}

fn build_column(cells: &[&Data]) -> (DataType, ArrayRef) {
    let kind = cells.iter().fold(Kind::Empty, |acc, cell| acc.merge(Kind::of(cell)));
    match kind {
        Kind::Int => {
            let values: Vec<Option<i64>> = cells
                .iter()
                .map(|cell| match cell {
                    Data::Int(i) => Some(*i),
                    Data::Float(f) => Some(*f as i64),
                    _ => None,
                })
                .collect();
            (DataType::Int64, Arc::new(Int64Array::from(values)))
        }
        Kind::Float => {
            let values: Vec<Option<f64>> = cells
                .iter()
                .map(|cell| match cell {
                    Data::Int(i) => Some(*i as f64),
                    Data::Float(f) => Some(*f),
                    _ => None,
                })
                .collect();
            (DataType::Float64, Arc::new(Float64Array::from(values)))
        }
        Kind::Bool => {
            let values: Vec<Option<bool>> = cells
                .iter()
                .map(|cell| match cell {
                    Data::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect();
            (DataType::Boolean, Arc::new(BooleanArray::from(values)))
        }
        Kind::Timestamp => {
            let values: Vec<Option<i64>> = cells
                .iter()
                .map(|cell| naive_datetime(cell).map(|dt| dt.and_utc().timestamp_millis()))
                .collect();
            (DataType::Timestamp(TimeUnit::Millisecond, None), Arc::new(TimestampMillisecondArray::from(values)))
        }
        Kind::Empty | Kind::Text => {
            let values: Vec<Option<String>> = cells
                .iter()
                .map(|cell| match cell {
                    Data::Empty | Data::Error(_) => None,
                    other => Some(match naive_datetime(other) {
                        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
                        None => other.to_string(),
                    }),
                })
                .collect();
            (DataType::Utf8, Arc::new(StringArray::from(values)))
        }
    }
}

/// Calendar value of a date cell. Durations and unparseable ISO strings are
/// not dates.
fn naive_datetime(cell: &Data) -> Option<NaiveDateTime> {
    match cell {
        Data::DateTime(dt) if !dt.is_duration() => dt.as_datetime(),
        Data::DateTimeIso(s) => s
            .parse::<NaiveDateTime>()
            .ok()
            .or_else(|| s.parse::<NaiveDate>().ok().and_then(|d| d.and_hms_opt(0, 0, 0))),
        _ => None,
    }
}
