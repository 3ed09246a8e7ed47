//! Filter types for building WHERE clauses.
//!
//! A [`Filter`] is a tree of constraints over qualified column names such as
//! `m.age` or `t.name`. It renders to parameterised SQL for a given
//! [`DatabaseType`] and can also be evaluated directly against a row, which
//! is what the in-memory engine does.
//!
//! ```rust
//! use squad_query::{DatabaseType, Filter, FilterValue};
//!
//! let filter = Filter::and([
//!     Filter::Gte("m.age".into(), FilterValue::Int(35)),
//!     Filter::Equals("t.name".into(), "teamB".into()),
//! ]);
//!
//! let (sql, params) = filter.to_sql(DatabaseType::SQLite);
//! assert_eq!(sql, "(m.age >= ? AND t.name = ?)");
//! assert_eq!(params.len(), 2);
//!
//! // An empty conjunction matches everything.
//! assert!(Filter::and(Vec::new()).is_none());
//! ```

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::{QueryError, QueryResult};
use crate::sql::DatabaseType;

/// A filter value that can be used in comparisons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// String value.
    String(String),
}

impl FilterValue {
    /// Check if this is a null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
        }
    }

    /// Compare two values with SQL semantics.
    ///
    /// Returns `Ok(None)` when either side is null (the comparison is
    /// unknown) and an error when the types cannot be compared.
    pub fn compare(&self, other: &FilterValue) -> QueryResult<Option<Ordering>> {
        let ordering = match (self, other) {
            (Self::Null, _) | (_, Self::Null) => return Ok(None),
            (Self::Bool(a), Self::Bool(b)) => a.partial_cmp(b),
            (Self::Int(a), Self::Int(b)) => a.partial_cmp(b),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Int(a), Self::Float(b)) => (*a as f64).partial_cmp(b),
            (Self::Float(a), Self::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Self::String(a), Self::String(b)) => a.partial_cmp(b),
            (a, b) => {
                return Err(QueryError::invalid_filter(format!(
                    "cannot compare {} with {}",
                    a.type_name(),
                    b.type_name()
                )));
            }
        };
        Ok(ordering)
    }

    /// Order values for sorting: nulls first, then by value.
    ///
    /// Incomparable values sort as equal so that sorting stays total.
    pub fn sort_cmp(&self, other: &FilterValue) -> Ordering {
        match (self.is_null(), other.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => match self.compare(other) {
                Ok(Some(ordering)) => ordering,
                _ => Ordering::Equal,
            },
        }
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for FilterValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl<T: Into<FilterValue>> From<Option<T>> for FilterValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

/// A complete filter that can be converted to SQL.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Filter {
    /// No filter (always true).
    #[default]
    None,

    /// Equals comparison.
    Equals(String, FilterValue),
    /// Not equals comparison.
    NotEquals(String, FilterValue),

    /// Less than comparison.
    Lt(String, FilterValue),
    /// Less than or equal comparison.
    Lte(String, FilterValue),
    /// Greater than comparison.
    Gt(String, FilterValue),
    /// Greater than or equal comparison.
    Gte(String, FilterValue),

    /// In a list of values.
    In(String, Vec<FilterValue>),

    /// Is null check.
    IsNull(String),
    /// Is not null check.
    IsNotNull(String),

    /// Logical AND of multiple filters.
    And(Vec<Filter>),
    /// Logical OR of multiple filters.
    Or(Vec<Filter>),
    /// Logical NOT of a filter.
    Not(Box<Filter>),
}

impl Filter {
    /// Create an empty filter (matches everything).
    pub fn none() -> Self {
        Self::None
    }

    /// Check if this filter is empty.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Create an AND filter, dropping empty members.
    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        let mut filters: Vec<_> = filters.into_iter().filter(|f| !f.is_none()).collect();
        match filters.len() {
            0 => Self::None,
            1 => filters.remove(0),
            _ => Self::And(filters),
        }
    }

    /// Create an OR filter, dropping empty members.
    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Self {
        let mut filters: Vec<_> = filters.into_iter().filter(|f| !f.is_none()).collect();
        match filters.len() {
            0 => Self::None,
            1 => filters.remove(0),
            _ => Self::Or(filters),
        }
    }

    /// Create a NOT filter.
    pub fn not(filter: Filter) -> Self {
        if filter.is_none() {
            return Self::None;
        }
        Self::Not(Box::new(filter))
    }

    /// Start an accumulating AND builder.
    pub fn and_builder() -> AndFilterBuilder {
        AndFilterBuilder::default()
    }

    /// Combine with another filter using AND.
    pub fn and_then(self, other: Filter) -> Self {
        if self.is_none() {
            return other;
        }
        if other.is_none() {
            return self;
        }
        match self {
            Self::And(mut filters) => {
                filters.push(other);
                Self::And(filters)
            }
            _ => Self::And(vec![self, other]),
        }
    }

    /// Collect every column name referenced by this filter.
    pub fn columns(&self) -> Vec<&str> {
        let mut columns = Vec::new();
        self.collect_columns(&mut columns);
        columns
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::None => {}
            Self::Equals(col, _)
            | Self::NotEquals(col, _)
            | Self::Lt(col, _)
            | Self::Lte(col, _)
            | Self::Gt(col, _)
            | Self::Gte(col, _)
            | Self::In(col, _)
            | Self::IsNull(col)
            | Self::IsNotNull(col) => out.push(col),
            Self::And(filters) | Self::Or(filters) => {
                for filter in filters {
                    filter.collect_columns(out);
                }
            }
            Self::Not(inner) => inner.collect_columns(out),
        }
    }

    /// Generate SQL for this filter with parameter placeholders.
    /// Returns (sql, params) where params are the values to bind.
    pub fn to_sql(&self, db_type: DatabaseType) -> (String, Vec<FilterValue>) {
        let mut params = Vec::new();
        let sql = self.write_sql(db_type, &mut params);
        (sql, params)
    }

    /// Generate SQL, appending bound values to an existing parameter list.
    pub fn write_sql(&self, db_type: DatabaseType, params: &mut Vec<FilterValue>) -> String {
        match self {
            Self::None => "1 = 1".to_string(),

            Self::Equals(col, val) if val.is_null() => format!("{} IS NULL", col),
            Self::NotEquals(col, val) if val.is_null() => format!("{} IS NOT NULL", col),
            Self::Equals(col, val) => compare_sql(db_type, params, col, "=", val),
            Self::NotEquals(col, val) => compare_sql(db_type, params, col, "<>", val),
            Self::Lt(col, val) => compare_sql(db_type, params, col, "<", val),
            Self::Lte(col, val) => compare_sql(db_type, params, col, "<=", val),
            Self::Gt(col, val) => compare_sql(db_type, params, col, ">", val),
            Self::Gte(col, val) => compare_sql(db_type, params, col, ">=", val),

            Self::In(_, values) if values.is_empty() => "1 = 0".to_string(),
            Self::In(col, values) => {
                let placeholders: Vec<_> = values
                    .iter()
                    .map(|v| {
                        params.push(v.clone());
                        db_type.placeholder()
                    })
                    .collect();
                format!("{} IN ({})", col, placeholders.join(", "))
            }

            Self::IsNull(col) => format!("{} IS NULL", col),
            Self::IsNotNull(col) => format!("{} IS NOT NULL", col),

            Self::And(filters) if filters.is_empty() => "1 = 1".to_string(),
            Self::And(filters) => {
                let parts: Vec<_> = filters.iter().map(|f| f.write_sql(db_type, params)).collect();
                format!("({})", parts.join(" AND "))
            }
            Self::Or(filters) if filters.is_empty() => "1 = 0".to_string(),
            Self::Or(filters) => {
                let parts: Vec<_> = filters.iter().map(|f| f.write_sql(db_type, params)).collect();
                format!("({})", parts.join(" OR "))
            }
            Self::Not(filter) => format!("NOT ({})", filter.write_sql(db_type, params)),
        }
    }

    /// Evaluate this filter with SQL three-valued logic.
    ///
    /// `lookup` resolves a column name to its value in the current row.
    /// A row matches only when the result is `Some(true)`.
    pub fn evaluate<F>(&self, lookup: &F) -> QueryResult<Option<bool>>
    where
        F: Fn(&str) -> QueryResult<FilterValue>,
    {
        let result = match self {
            Self::None => Some(true),

            Self::Equals(col, val) if val.is_null() => Some(lookup(col.as_str())?.is_null()),
            Self::NotEquals(col, val) if val.is_null() => Some(!lookup(col.as_str())?.is_null()),
            Self::Equals(col, val) => lookup(col.as_str())?.compare(val)?.map(Ordering::is_eq),
            Self::NotEquals(col, val) => lookup(col.as_str())?.compare(val)?.map(Ordering::is_ne),
            Self::Lt(col, val) => lookup(col.as_str())?.compare(val)?.map(Ordering::is_lt),
            Self::Lte(col, val) => lookup(col.as_str())?.compare(val)?.map(Ordering::is_le),
            Self::Gt(col, val) => lookup(col.as_str())?.compare(val)?.map(Ordering::is_gt),
            Self::Gte(col, val) => lookup(col.as_str())?.compare(val)?.map(Ordering::is_ge),

            Self::In(col, values) => {
                let actual = lookup(col.as_str())?;
                let mut result = Some(false);
                for value in values {
                    match actual.compare(value)? {
                        Some(Ordering::Equal) => return Ok(Some(true)),
                        Some(_) => {}
                        None => result = None,
                    }
                }
                result
            }

            Self::IsNull(col) => Some(lookup(col.as_str())?.is_null()),
            Self::IsNotNull(col) => Some(!lookup(col.as_str())?.is_null()),

            Self::And(filters) => {
                let mut result = Some(true);
                for filter in filters {
                    match filter.evaluate(lookup)? {
                        Some(false) => return Ok(Some(false)),
                        None => result = None,
                        Some(true) => {}
                    }
                }
                result
            }
            Self::Or(filters) => {
                let mut result = Some(false);
                for filter in filters {
                    match filter.evaluate(lookup)? {
                        Some(true) => return Ok(Some(true)),
                        None => result = None,
                        Some(false) => {}
                    }
                }
                result
            }
            Self::Not(filter) => filter.evaluate(lookup)?.map(|b| !b),
        };
        Ok(result)
    }
}

fn compare_sql(
    db_type: DatabaseType,
    params: &mut Vec<FilterValue>,
    col: &str,
    op: &str,
    val: &FilterValue,
) -> String {
    params.push(val.clone());
    format!("{} {} {}", col, op, db_type.placeholder())
}

/// Accumulates constraints into a single conjunction.
///
/// ```rust
/// use squad_query::{Filter, FilterValue};
///
/// let filter = Filter::and_builder()
///     .push(Filter::Gte("m.age".into(), FilterValue::Int(20)))
///     .push_opt(None)
///     .build();
/// assert_eq!(filter, Filter::Gte("m.age".into(), FilterValue::Int(20)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct AndFilterBuilder {
    filters: Vec<Filter>,
}

impl AndFilterBuilder {
    /// Add a constraint.
    pub fn push(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Add a constraint when one is present.
    pub fn push_opt(self, filter: Option<Filter>) -> Self {
        match filter {
            Some(filter) => self.push(filter),
            None => self,
        }
    }

    /// Add a constraint in place.
    pub fn and(&mut self, filter: Filter) -> &mut Self {
        self.filters.push(filter);
        self
    }

    /// Number of accumulated constraints.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Whether no constraint was added.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Finish the conjunction.
    pub fn build(self) -> Filter {
        Filter::and(self.filters)
    }
}
