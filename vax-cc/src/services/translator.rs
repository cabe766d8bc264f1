//! Record translation between the external services' wire formats
//!
//! Two isolated stages, so either can be swapped when an external schema
//! changes:
//!
//! 1. records → pyCrossVA CSV (column names prefixed with `-`, plus a
//!    leading blank-named row-index column);
//! 2. pyCrossVA's CSV response → the InterVA5 JSON payload (blank index
//!    header renamed to `"ID"`, sentinel values remapped per field).
//!
//! The row index written in stage 1 is the correlation identifier: both
//! services round-trip it, and the response parser resolves results back
//! to their source records through it.

use crate::config::AlgorithmSettings;
use crate::error::CodingError;
use crate::models::VerbalAutopsy;
use serde_json::{Map, Value};

/// Serialize records to the transform service's CSV input.
///
/// Header is the union of survey field names in first-seen order, each
/// prefixed with `-` per the pyCrossVA column-naming convention. The first
/// column has a blank name and carries each record's row index.
pub fn to_pycross_csv(verbal_autopsies: &[VerbalAutopsy]) -> Result<String, CodingError> {
    let mut columns: Vec<&str> = Vec::new();
    for va in verbal_autopsies {
        for name in va.fields.keys() {
            if !columns.contains(&name.as_str()) {
                columns.push(name);
            }
        }
    }

    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header: Vec<String> = Vec::with_capacity(columns.len() + 1);
    header.push(String::new());
    header.extend(columns.iter().map(|name| format!("-{name}")));
    writer
        .write_record(&header)
        .map_err(|e| CodingError::Translation(e.to_string()))?;

    for (index, va) in verbal_autopsies.iter().enumerate() {
        let mut record: Vec<String> = Vec::with_capacity(columns.len() + 1);
        record.push(index.to_string());
        for column in &columns {
            record.push(va.fields.get(*column).map(csv_value).unwrap_or_default());
        }
        writer
            .write_record(&record)
            .map_err(|e| CodingError::Translation(e.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| CodingError::Translation(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| CodingError::Translation(e.to_string()))
}

/// Flatten a survey answer for the CSV cell
fn csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Reformat the transform service's CSV response into the InterVA5 JSON
/// payload.
///
/// The blank-named index column becomes `"ID"`. The algorithm encodes
/// binary responses as `"."`/`"y"`, so the transform output's `"0.0"` and
/// `"1.0"` are remapped — structurally, whole-value per field, never a
/// textual replace over serialized JSON, so a free-text answer containing
/// `0.0` as a substring can never be corrupted. The `ID` column is exempt.
pub fn pycross_csv_to_algorithm_input(
    transform_csv: &str,
    settings: &AlgorithmSettings,
) -> Result<String, CodingError> {
    let mut reader = csv::Reader::from_reader(transform_csv.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| CodingError::Translation(e.to_string()))?
        .iter()
        .map(|h| if h.is_empty() { "ID".to_string() } else { h.to_string() })
        .collect();

    let mut rows: Vec<Value> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| CodingError::Translation(e.to_string()))?;
        let mut row = Map::new();
        for (header, value) in headers.iter().zip(record.iter()) {
            let value = if header == "ID" {
                value.to_string()
            } else {
                remap_sentinel(value)
            };
            row.insert(header.clone(), Value::String(value));
        }
        rows.push(Value::Object(row));
    }

    let mut payload = Map::new();
    payload.insert("Input".to_string(), Value::Array(rows));

    let settings_value = serde_json::to_value(settings)
        .map_err(|e| CodingError::Translation(e.to_string()))?;
    if let Value::Object(settings_map) = settings_value {
        payload.extend(settings_map);
    }

    serde_json::to_string(&Value::Object(payload))
        .map_err(|e| CodingError::Translation(e.to_string()))
}

/// InterVA5's binary-response encoding: absent is `"."`, present is `"y"`
fn remap_sentinel(value: &str) -> String {
    match value {
        "0.0" => ".".to_string(),
        "1.0" => "y".to_string(),
        other => other.to_string(),
    }
}
