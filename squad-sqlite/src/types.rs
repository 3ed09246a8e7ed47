//! Conversions between filter values and SQLite values.

use rusqlite::types::Value;

use squad_query::filter::FilterValue;

use crate::error::{SqliteError, SqliteResult};

/// Convert a bound parameter to a SQLite value.
pub fn to_sqlite(value: &FilterValue) -> Value {
    match value {
        FilterValue::Null => Value::Null,
        FilterValue::Bool(b) => Value::Integer(i64::from(*b)),
        FilterValue::Int(i) => Value::Integer(*i),
        FilterValue::Float(f) => Value::Real(*f),
        FilterValue::String(s) => Value::Text(s.clone()),
    }
}

/// Convert all bound parameters.
pub fn to_sqlite_params(values: &[FilterValue]) -> Vec<Value> {
    values.iter().map(to_sqlite).collect()
}

/// Read a result cell back as a filter value.
///
/// Blobs are accepted only when they hold UTF-8 text.
pub fn from_sqlite(value: Value) -> SqliteResult<FilterValue> {
    Ok(match value {
        Value::Null => FilterValue::Null,
        Value::Integer(i) => FilterValue::Int(i),
        Value::Real(f) => FilterValue::Float(f),
        Value::Text(s) => FilterValue::String(s),
        Value::Blob(bytes) => FilterValue::String(
            String::from_utf8(bytes).map_err(|e| SqliteError::type_conversion(e.to_string()))?,
        ),
    })
}
