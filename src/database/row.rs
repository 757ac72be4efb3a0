//! Row to JSON conversion for dynamic reads.
//!
//! Record shapes come from entity descriptors rather than Rust structs, so
//! rows are decoded by declared column type into `serde_json` values. Text
//! stays text: a 16-digit NIK never turns into a number.

use serde_json::{Map, Number, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, TypeInfo};

pub fn row_to_json(row: &SqliteRow) -> Map<String, Value> {
    let mut out = Map::new();
    for (index, column) in row.columns().iter().enumerate() {
        let value = decode_value(row, index, column.type_info().name());
        out.insert(column.name().to_string(), value);
    }
    out
}

fn decode_value(row: &SqliteRow, index: usize, type_name: &str) -> Value {
    match type_name {
        "INTEGER" | "BOOLEAN" => match row.try_get::<Option<i64>, _>(index) {
            Ok(Some(n)) => Value::Number(Number::from(n)),
            Ok(None) => Value::Null,
            Err(_) => decode_text(row, index),
        },
        "REAL" | "NUMERIC" => match row.try_get::<Option<f64>, _>(index) {
            Ok(Some(f)) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
            Ok(None) => Value::Null,
            Err(_) => decode_text(row, index),
        },
        "BLOB" => Value::Null,
        // TEXT, DATE, DATETIME and untyped expressions
        _ => decode_text(row, index),
    }
}

fn decode_text(row: &SqliteRow, index: usize) -> Value {
    match row.try_get::<Option<String>, _>(index) {
        Ok(Some(s)) => Value::String(s),
        _ => Value::Null,
    }
}
