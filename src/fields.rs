//! Tolerant field lookup over loosely-typed source records.
//!
//! Upstream schemas drift between versions and between sources, so every
//! logical field is looked up through an ordered list of candidate property
//! names. Candidates may be dotted paths (`images.large`, `card_faces.0.name`)
//! reaching into nested objects and arrays. The first candidate holding a
//! present, non-blank value wins.

use serde_json::{Map, Value};

use crate::error::RecordError;
use crate::models::Style;

/// Resolve a dotted path inside `record`.
fn resolve<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    if let Some(value) = record.get(path) {
        return Some(value);
    }

    let mut current = record;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

/// First present, non-blank value among `candidates`, in priority order.
pub fn lookup<'a>(record: &'a Value, candidates: &[&str]) -> Option<&'a Value> {
    candidates
        .iter()
        .filter_map(|candidate| resolve(record, candidate))
        .find(|value| is_present(value))
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
    .filter(|s| !s.is_empty())
}

/// First candidate rendered as trimmed text. Arrays of scalars are joined
/// with newlines.
pub fn text(record: &Value, candidates: &[&str]) -> Option<String> {
    let value = lookup(record, candidates)?;
    match value {
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(scalar_text).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join("\n"))
            }
        }
        other => scalar_text(other),
    }
}

/// Like [`text`], but a missing value is a record error.
pub fn required_text(
    record: &Value,
    field: &'static str,
    candidates: &[&str],
) -> Result<String, RecordError> {
    text(record, candidates).ok_or(RecordError::MissingField(field))
}

/// First candidate as a list of strings. Delimited strings (`foil;etched`,
/// `foil|nonfoil`, `foil, nonfoil`) are split.
pub fn list(record: &Value, candidates: &[&str]) -> Vec<String> {
    match lookup(record, candidates) {
        Some(Value::Array(items)) => items.iter().filter_map(scalar_text).collect(),
        Some(Value::String(s)) => s
            .split([';', '|', ','])
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect(),
        Some(other) => scalar_text(other).into_iter().collect(),
        None => Vec::new(),
    }
}

/// Set codes are stored upper-cased.
pub fn set_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Collector numbers are required; blank ones reject the record.
pub fn collector_number(raw: Option<String>) -> Result<String, RecordError> {
    raw.map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or(RecordError::BlankNumber)
}

/// Whether a finish indicator names a foil finish. Negated forms such as
/// `nonfoil` or `Non-Foil` do not count.
pub fn is_foil_indicator(indicator: &str) -> bool {
    let lowered = indicator.to_lowercase();
    let stripped = lowered
        .replace("nonfoil", "")
        .replace("non-foil", "")
        .replace("non foil", "");
    stripped.contains("foil")
}

/// `Foil` if any indicator names a foil finish, else `Standard`.
pub fn style_from_finishes<I, S>(finishes: I) -> Style
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    if finishes
        .into_iter()
        .any(|finish| is_foil_indicator(finish.as_ref()))
    {
        Style::Foil
    } else {
        Style::Standard
    }
}

/// Serialize source-specific attributes into an opaque details blob.
///
/// Keys come out sorted, so an unchanged record always produces the same
/// string. Returns `None` when nothing was collected.
pub fn details_json(map: Map<String, Value>) -> Result<Option<String>, RecordError> {
    if map.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::to_string(&Value::Object(map))?))
}

/// Collect `(key, candidates)` pairs from `record` into a details blob.
pub fn collect_details(
    record: &Value,
    fields: &[(&str, &[&str])],
) -> Result<Option<String>, RecordError> {
    let mut map = Map::new();
    for (key, candidates) in fields {
        if let Some(value) = lookup(record, candidates) {
            map.insert((*key).to_string(), value.clone());
        }
    }
    details_json(map)
}
