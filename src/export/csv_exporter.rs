use csv::{ReaderBuilder, Terminator, WriterBuilder};
use serde_json::{Map, Value};
use tracing::debug;

use super::ExportFormat;
use crate::error::CodecError;

/// Format records as CSV.
///
/// An array of objects takes its header row from the keys of the first
/// record; later records that lack one of those keys leave the cell empty and
/// keys absent from the first record are dropped. A single object is written
/// as a one-row table. An array of arrays is written as bare rows. An empty
/// array produces an empty document.
pub fn format_csv(data: &Value) -> Result<String, CodecError> {
    let rows: Vec<&Value> = match data {
        Value::Array(items) => items.iter().collect(),
        Value::Object(_) => vec![data],
        other => {
            return Err(CodecError::encode(
                ExportFormat::Csv,
                format!("expected an object or an array of records, got {}", value_kind(other)),
            ))
        }
    };

    let Some(first) = rows.first() else {
        return Ok(String::new());
    };

    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    match first {
        Value::Object(first_record) => {
            let headers: Vec<&str> = first_record.keys().map(String::as_str).collect();
            writer.write_record(&headers).map_err(encode_error)?;

            for (index, row) in rows.iter().enumerate() {
                let record = row.as_object().ok_or_else(|| {
                    CodecError::encode(
                        ExportFormat::Csv,
                        format!("row {} is {}, expected an object", index, value_kind(row)),
                    )
                })?;
                let cells: Vec<String> = headers
                    .iter()
                    .map(|header| record.get(*header).map(cell_text).unwrap_or_default())
                    .collect();
                writer.write_record(&cells).map_err(encode_error)?;
            }
        }
        Value::Array(_) => {
            for (index, row) in rows.iter().enumerate() {
                let cells = row.as_array().ok_or_else(|| {
                    CodecError::encode(
                        ExportFormat::Csv,
                        format!("row {} is {}, expected an array", index, value_kind(row)),
                    )
                })?;
                let cells: Vec<String> = cells.iter().map(cell_text).collect();
                writer.write_record(&cells).map_err(encode_error)?;
            }
        }
        other => {
            return Err(CodecError::encode(
                ExportFormat::Csv,
                format!("array elements must be records, got {}", value_kind(other)),
            ))
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| CodecError::encode(ExportFormat::Csv, e.error()))?;
    let mut text = String::from_utf8(bytes).map_err(|e| CodecError::encode(ExportFormat::Csv, e))?;

    // Rows are newline-joined, no trailing terminator
    if text.ends_with('\n') {
        text.pop();
    }

    debug!("Formatted {} CSV rows", rows.len());
    Ok(text)
}

/// Parse CSV text with a header row into an array of row objects.
pub fn parse_csv(text: &str) -> Result<Value, CodecError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| CodecError::parse(ExportFormat::Csv, e))?
        .clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| CodecError::parse(ExportFormat::Csv, e))?;
        let mut row = Map::new();
        for (index, field) in record.iter().enumerate() {
            let key = headers
                .get(index)
                .map(str::to_string)
                .unwrap_or_else(|| format!("field_{}", index));
            row.insert(key, Value::String(field.to_string()));
        }
        rows.push(Value::Object(row));
    }

    Ok(Value::Array(rows))
}

/// Text placed in a single cell: strings verbatim, everything else as JSON
fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn encode_error(err: csv::Error) -> CodecError {
    CodecError::encode(ExportFormat::Csv, err)
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
