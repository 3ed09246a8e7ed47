//! Result rows and the mapping step from rows to typed values.
//!
//! Engines return [`Row`]s keyed by output column name (the projection
//! alias). Typed results are produced by [`FromRow`], so projection types
//! never depend on a particular store.

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{QueryError, QueryResult};
use crate::filter::FilterValue;

/// An ordered set of named column values.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Row {
    columns: IndexMap<String, FilterValue>,
}

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column value, builder style.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.insert(column, value);
        self
    }

    /// Set a column value.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<FilterValue>) {
        self.columns.insert(column.into(), value.into());
    }

    /// Remove a column, returning its value.
    pub fn remove(&mut self, column: &str) -> Option<FilterValue> {
        self.columns.shift_remove(column)
    }

    /// Get a raw column value.
    pub fn get(&self, column: &str) -> Option<&FilterValue> {
        self.columns.get(column)
    }

    /// Whether the row has the column.
    pub fn contains(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    /// Column names in order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Iterate over `(column, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    fn required(&self, column: &str) -> QueryResult<&FilterValue> {
        self.columns.get(column).ok_or_else(|| {
            QueryError::deserialization(format!("missing column '{}'", column)).with_field(column)
        })
    }

    /// Read a nullable integer column.
    pub fn get_opt_i64(&self, column: &str) -> QueryResult<Option<i64>> {
        match self.required(column)? {
            FilterValue::Null => Ok(None),
            FilterValue::Int(v) => Ok(Some(*v)),
            other => Err(type_error(column, "int", other)),
        }
    }

    /// Read a non-null integer column.
    pub fn get_i64(&self, column: &str) -> QueryResult<i64> {
        self.get_opt_i64(column)?
            .ok_or_else(|| null_error(column))
    }

    /// Read a non-null 32-bit integer column.
    pub fn get_i32(&self, column: &str) -> QueryResult<i32> {
        let value = self.get_i64(column)?;
        i32::try_from(value).map_err(|_| {
            QueryError::deserialization(format!("column '{}' value {} overflows i32", column, value))
                .with_field(column)
        })
    }

    /// Read a nullable text column.
    pub fn get_opt_string(&self, column: &str) -> QueryResult<Option<String>> {
        match self.required(column)? {
            FilterValue::Null => Ok(None),
            FilterValue::String(v) => Ok(Some(v.clone())),
            other => Err(type_error(column, "string", other)),
        }
    }

    /// Read a non-null text column.
    pub fn get_string(&self, column: &str) -> QueryResult<String> {
        self.get_opt_string(column)?
            .ok_or_else(|| null_error(column))
    }
}

fn type_error(column: &str, expected: &str, actual: &FilterValue) -> QueryError {
    QueryError::deserialization(format!(
        "column '{}' expected {}, found {}",
        column,
        expected,
        actual.type_name()
    ))
    .with_field(column)
}

fn null_error(column: &str) -> QueryError {
    QueryError::deserialization(format!("column '{}' is null", column)).with_field(column)
}

impl FromIterator<(String, FilterValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, FilterValue)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Row {
    type Item = (String, FilterValue);
    type IntoIter = indexmap::map::IntoIter<String, FilterValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.into_iter()
    }
}

/// Trait for converting a result row to a Rust type.
pub trait FromRow: Sized {
    /// Convert a row to this type.
    fn from_row(row: &Row) -> QueryResult<Self>;
}

impl FromRow for Row {
    fn from_row(row: &Row) -> QueryResult<Self> {
        Ok(row.clone())
    }
}
