//! Record normalization
//!
//! Turns a batch of [`RawRecord`]s into a [`Table`] whose cells are all
//! primitives. The decision to serialize is made per column, not per cell: if
//! any record holds an object or a list under a field, every value of that
//! field in the batch becomes its JSON text, absent values included. A column
//! therefore never mixes structured and plain values.

use comics_common::{Cell, Result, Table};
use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

use crate::source::RawRecord;

/// Normalize a batch for the staging table.
///
/// Columns are the union of all record fields in first-seen order. Fields a
/// record does not carry become [`Cell::Null`] unless the column is serialized.
pub fn normalize(records: &[RawRecord]) -> Result<Table> {
    let mut columns: Vec<String> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut structured: HashSet<&str> = HashSet::new();

    for record in records {
        for (name, value) in record.fields() {
            if seen.insert(name) {
                columns.push(name.clone());
            }
            if value.is_object() || value.is_array() {
                structured.insert(name);
            }
        }
    }

    if !structured.is_empty() {
        debug!(columns = ?structured, "Serializing structured columns to JSON text");
    }

    let mut table = Table::new(columns.clone());
    for record in records {
        let row = columns
            .iter()
            .map(|name| {
                let value = record.fields().get(name);
                if structured.contains(name.as_str()) {
                    serde_json::to_string(value.unwrap_or(&Value::Null)).map(Cell::Text)
                } else {
                    Ok(value.map(primitive_cell).unwrap_or(Cell::Null))
                }
            })
            .collect::<std::result::Result<Vec<Cell>, _>>()?;
        table.push_row(row)?;
    }

    Ok(table)
}

/// Normalize for the historical bulk load: like [`normalize`], with every
/// missing value filled with the empty string.
pub fn normalize_filled(records: &[RawRecord]) -> Result<Table> {
    let mut table = normalize(records)?;
    let filled = table.fill_missing(&Cell::Text(String::new()));
    debug!(filled, "Filled missing values with empty strings");
    Ok(table)
}

fn primitive_cell(value: &Value) -> Cell {
    match value {
        Value::Null => Cell::Null,
        Value::Bool(b) => Cell::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Cell::Int(i),
            None => n.as_f64().map(Cell::Float).unwrap_or(Cell::Null),
        },
        Value::String(s) => Cell::Text(s.clone()),
        // Structured values are routed through JSON text before reaching here
        Value::Array(_) | Value::Object(_) => Cell::Text(value.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(num: i64, extra: Option<Value>) -> RawRecord {
        let mut body = json!({
            "num": num, "title": "T", "month": "3", "year": "2010",
            "transcript": "", "img": "i", "alt": "a"
        });
        if let Some(extra) = extra {
            body["extra"] = extra;
        }
        RawRecord::from_json(num, body).unwrap()
    }

    #[test]
    fn test_structured_column_is_serialized_for_every_row() {
        let records = vec![
            record(1, Some(json!({"headerextra": "", "links": ["a"]}))),
            record(2, None),
            record(3, Some(json!("plain"))),
        ];

        let table = normalize(&records).unwrap();
        let extra = table.column("extra").unwrap();

        assert_eq!(
            extra[0],
            &Cell::Text(r#"{"headerextra":"","links":["a"]}"#.to_string())
        );
        assert_eq!(extra[1], &Cell::Text("null".to_string()));
        assert_eq!(extra[2], &Cell::Text("\"plain\"".to_string()));
    }

    #[test]
    fn test_primitive_columns_keep_their_types() {
        let records = vec![record(1, Some(json!(2.5))), record(2, Some(json!(true)))];
        let table = normalize(&records).unwrap();

        assert_eq!(table.get(0, "num"), Some(&Cell::Int(1)));
        assert_eq!(table.get(0, "month"), Some(&Cell::Text("3".to_string())));
        assert_eq!(table.get(0, "extra"), Some(&Cell::Float(2.5)));
        assert_eq!(table.get(1, "extra"), Some(&Cell::Bool(true)));
    }

    #[test]
    fn test_columns_are_union_of_fields() {
        let records = vec![record(1, None), record(2, Some(json!("x")))];
        let table = normalize(&records).unwrap();

        assert_eq!(table.len(), 2);
        assert!(table.column_index("extra").is_some());
        assert_eq!(table.get(0, "extra"), Some(&Cell::Null));
    }

    #[test]
    fn test_columns_keep_first_seen_order() {
        let records = vec![record(1, None), record(2, Some(json!("x")))];
        let table = normalize(&records).unwrap();

        assert_eq!(
            table.columns(),
            &["num", "title", "month", "year", "transcript", "img", "alt", "extra"]
        );
    }

    #[test]
    fn test_filled_variant_replaces_missing_values() {
        let records = vec![record(1, None), record(2, Some(json!("x")))];
        let table = normalize_filled(&records).unwrap();

        assert_eq!(table.get(0, "extra"), Some(&Cell::Text(String::new())));
        assert!(table.rows().iter().flatten().all(|c| !c.is_null()));
    }

    #[test]
    fn test_empty_batch_yields_empty_table() {
        let table = normalize(&[]).unwrap();
        assert!(table.is_empty());
        assert!(table.columns().is_empty());
    }
}
