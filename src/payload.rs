//! Uploaded file payloads: format sniffing and record extraction.

use serde_json::{Map, Value};

use crate::error::{ImportError, RecordError, Result};

/// One uploaded record, or the reason that row could not be read.
pub type RawRecord = std::result::Result<Value, RecordError>;

/// Wrapper properties that commonly hold the record array in exported JSON.
const WRAPPER_KEYS: &[&str] = &["data", "cards", "results", "items"];

/// Detected format of an uploaded payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    JsonArray,
    JsonObject,
    Csv,
    Empty,
}

/// Skip a UTF-8 BOM and leading whitespace.
fn content_start(bytes: &[u8]) -> &[u8] {
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    &bytes[start..]
}

/// Classify a payload by its first non-whitespace byte.
pub fn sniff(bytes: &[u8]) -> PayloadFormat {
    match content_start(bytes).first() {
        None => PayloadFormat::Empty,
        Some(b'[') => PayloadFormat::JsonArray,
        Some(b'{') => PayloadFormat::JsonObject,
        Some(_) => PayloadFormat::Csv,
    }
}

/// Parse an uploaded payload into raw records.
///
/// A JSON payload that does not parse fails as a whole. CSV rows are decoded
/// one at a time, so an unreadable row only fails that record.
pub fn parse_records(bytes: &[u8]) -> Result<Vec<RawRecord>> {
    let content = content_start(bytes);
    let records = match sniff(bytes) {
        PayloadFormat::Empty => Vec::new(),
        PayloadFormat::JsonArray => {
            let value: Value = serde_json::from_slice(content)?;
            records_from_array(value)?
        }
        PayloadFormat::JsonObject => {
            let value: Value = serde_json::from_slice(content)?;
            records_from_object(value)?
        }
        PayloadFormat::Csv => return parse_csv(content),
    };
    Ok(records.into_iter().map(Ok).collect())
}

fn records_from_array(value: Value) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        _ => Err(ImportError::Payload("expected a JSON array".to_string())),
    }
}

fn records_from_object(value: Value) -> Result<Vec<Value>> {
    let Value::Object(mut map) = value else {
        return Err(ImportError::Payload("expected a JSON object".to_string()));
    };

    for key in WRAPPER_KEYS {
        if matches!(map.get(*key), Some(Value::Array(_))) {
            if let Some(Value::Array(items)) = map.remove(*key) {
                return Ok(items);
            }
        }
    }

    Ok(vec![Value::Object(map)])
}

/// Read a headed CSV into one JSON object per row. Blank cells are left out
/// so they read as absent fields.
fn parse_csv(content: &[u8]) -> Result<Vec<RawRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut records = Vec::new();
    for row in reader.byte_records() {
        let row = match row {
            Ok(row) => row,
            Err(err) => {
                let line = err.position().map_or(0, |pos| pos.line());
                records.push(Err(RecordError::Unreadable {
                    line,
                    message: err.to_string(),
                }));
                continue;
            }
        };
        if row.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        records.push(decode_row(&headers, &row));
    }

    Ok(records)
}

fn decode_row(headers: &[String], row: &csv::ByteRecord) -> RawRecord {
    let line = row.position().map_or(0, |pos| pos.line());
    let mut map = Map::new();
    for (header, cell) in headers.iter().zip(row.iter()) {
        if header.is_empty() || cell.is_empty() {
            continue;
        }
        let text = std::str::from_utf8(cell).map_err(|err| RecordError::Unreadable {
            line,
            message: format!("column '{header}' is not valid UTF-8 ({err})"),
        })?;
        map.insert(header.clone(), Value::String(text.to_string()));
    }
    Ok(Value::Object(map))
}
