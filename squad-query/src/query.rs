//! Query descriptors: projected selects over joined tables and their counts.
//!
//! A [`SelectQuery`] is a plain value describing what to read: a base table,
//! joins, an ordered projection, a filter, an ordering and a pagination
//! window. Engines either render it to SQL with [`SelectQuery::build_sql`]
//! or interpret it directly. [`SelectQuery::count_query`] derives the
//! matching [`CountQuery`] (same source and filter, no projection, ordering
//! or window).
//!
//! ```rust
//! use squad_query::{DatabaseType, Filter, FilterValue, SelectQuery, TableRef};
//!
//! let query = SelectQuery::new(TableRef::aliased("member", "m"))
//!     .left_join(TableRef::aliased("team", "t"), "m.team_id", "t.id")
//!     .column("m.id", "member_id")
//!     .column("t.name", "team_name")
//!     .r#where(Filter::Gte("m.age".into(), FilterValue::Int(35)))
//!     .skip(0)
//!     .take(3);
//!
//! let (sql, params) = query.build_sql(DatabaseType::SQLite);
//! assert_eq!(
//!     sql,
//!     "SELECT m.id AS member_id, t.name AS team_name FROM member m \
//!      LEFT JOIN team t ON m.team_id = t.id WHERE m.age >= ? LIMIT 3 OFFSET 0"
//! );
//! assert_eq!(params.len(), 1);
//!
//! let (count_sql, _) = query.count_query().build_sql(DatabaseType::SQLite);
//! assert_eq!(
//!     count_sql,
//!     "SELECT COUNT(*) FROM member m LEFT JOIN team t ON m.team_id = t.id WHERE m.age >= ?"
//! );
//! ```

use std::collections::HashSet;

use crate::error::{QueryError, QueryResult};
use crate::filter::{Filter, FilterValue};
use crate::pagination::Pagination;
use crate::sql::DatabaseType;
use crate::types::OrderBy;

/// A table in FROM or JOIN position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    /// Table name.
    pub name: String,
    /// Alias used to qualify columns. Defaults to the table name.
    pub alias: String,
}

impl TableRef {
    /// Reference a table by its own name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            alias: name.clone(),
            name,
        }
    }

    /// Reference a table under an alias.
    pub fn aliased(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: alias.into(),
        }
    }

    fn write_sql(&self, buffer: &mut String) {
        buffer.push_str(&self.name);
        if self.alias != self.name {
            buffer.push(' ');
            buffer.push_str(&self.alias);
        }
    }
}

/// Join flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinKind {
    /// Keep only rows with a match on both sides.
    Inner,
    /// Keep every left row; unmatched right columns read as null.
    Left,
}

impl JoinKind {
    /// Get the SQL keyword for this join.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
        }
    }
}

/// An equi-join `table ON left = right`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    /// Join flavour.
    pub kind: JoinKind,
    /// Joined table.
    pub table: TableRef,
    /// Column on the already-joined side.
    pub left: String,
    /// Column on the joined table.
    pub right: String,
}

/// One projected output column: `column AS alias`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectColumn {
    /// Qualified source column.
    pub column: String,
    /// Output name.
    pub alias: String,
}

/// A projected select over a base table and its joins.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    from: TableRef,
    joins: Vec<Join>,
    columns: Vec<SelectColumn>,
    filter: Filter,
    order_by: OrderBy,
    pagination: Pagination,
}

impl SelectQuery {
    /// Start a query over a base table.
    pub fn new(from: TableRef) -> Self {
        Self {
            from,
            joins: Vec::new(),
            columns: Vec::new(),
            filter: Filter::None,
            order_by: OrderBy::none(),
            pagination: Pagination::new(),
        }
    }

    /// Project a column under an output alias.
    pub fn column(mut self, column: impl Into<String>, alias: impl Into<String>) -> Self {
        self.columns.push(SelectColumn {
            column: column.into(),
            alias: alias.into(),
        });
        self
    }

    /// Project each column of `table_alias` under its own name.
    pub fn columns_of(mut self, table_alias: &str, columns: &[&str]) -> Self {
        for column in columns {
            self.columns.push(SelectColumn {
                column: format!("{}.{}", table_alias, column),
                alias: (*column).to_string(),
            });
        }
        self
    }

    /// Add a join.
    pub fn join(mut self, kind: JoinKind, table: TableRef, left: impl Into<String>, right: impl Into<String>) -> Self {
        self.joins.push(Join {
            kind,
            table,
            left: left.into(),
            right: right.into(),
        });
        self
    }

    /// Add a left outer join.
    pub fn left_join(self, table: TableRef, left: impl Into<String>, right: impl Into<String>) -> Self {
        self.join(JoinKind::Left, table, left, right)
    }

    /// Add an inner join.
    pub fn inner_join(self, table: TableRef, left: impl Into<String>, right: impl Into<String>) -> Self {
        self.join(JoinKind::Inner, table, left, right)
    }

    /// Add a filter condition, ANDed with any existing one.
    pub fn r#where(mut self, filter: impl Into<Filter>) -> Self {
        self.filter = std::mem::take(&mut self.filter).and_then(filter.into());
        self
    }

    /// Set the order by clause.
    pub fn order_by(mut self, order: impl Into<OrderBy>) -> Self {
        self.order_by = order.into();
        self
    }

    /// Skip a number of records.
    pub fn skip(mut self, n: u64) -> Self {
        self.pagination = self.pagination.skip(n);
        self
    }

    /// Take a limited number of records.
    pub fn take(mut self, n: u64) -> Self {
        self.pagination = self.pagination.take(n);
        self
    }

    /// Replace the pagination window.
    pub fn paginate(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    /// Base table.
    pub fn from_table(&self) -> &TableRef {
        &self.from
    }

    /// Joins in declaration order.
    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    /// Projected columns in output order.
    pub fn select_columns(&self) -> &[SelectColumn] {
        &self.columns
    }

    /// The filter.
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// The ordering.
    pub fn ordering(&self) -> &OrderBy {
        &self.order_by
    }

    /// The pagination window.
    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    /// Derive the count query: same source and filter, nothing else.
    pub fn count_query(&self) -> CountQuery {
        CountQuery {
            from: self.from.clone(),
            joins: self.joins.clone(),
            filter: self.filter.clone(),
        }
    }

    /// Check that the query can be expressed: declared aliases are unique,
    /// the projection is non-empty and every qualified column names a
    /// declared alias.
    pub fn validate(&self) -> QueryResult<()> {
        let aliases = validate_source(&self.from, &self.joins, &self.filter)?;

        if self.columns.is_empty() {
            return Err(QueryError::invalid_select("select query has no projected columns"));
        }

        let mut outputs = HashSet::new();
        for column in &self.columns {
            check_qualifier(&column.column, &aliases)?;
            if !outputs.insert(column.alias.as_str()) {
                return Err(QueryError::invalid_select(format!(
                    "output column '{}' is projected twice",
                    column.alias
                )));
            }
        }

        for field in self.order_by.fields() {
            if !outputs.contains(field.column.as_str()) {
                check_qualifier(&field.column, &aliases)?;
            }
        }

        Ok(())
    }

    /// Build the SQL statement.
    pub fn build_sql(&self, db_type: DatabaseType) -> (String, Vec<FilterValue>) {
        self.render(db_type, None)
    }

    /// Build the SQL statement with an extra `COUNT(*) OVER ()` column named
    /// `total_alias`, giving the full match count alongside each page row.
    pub fn build_sql_with_total(&self, db_type: DatabaseType, total_alias: &str) -> (String, Vec<FilterValue>) {
        self.render(db_type, Some(total_alias))
    }

    fn render(&self, db_type: DatabaseType, total_alias: Option<&str>) -> (String, Vec<FilterValue>) {
        let mut params = Vec::new();
        let mut sql = String::with_capacity(128);

        sql.push_str("SELECT ");
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push_str(&column.column);
            sql.push_str(" AS ");
            sql.push_str(&column.alias);
        }
        if let Some(alias) = total_alias {
            sql.push_str(", COUNT(*) OVER () AS ");
            sql.push_str(alias);
        }

        write_source(&mut sql, &self.from, &self.joins, &self.filter, db_type, &mut params);

        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            self.order_by.write_sql(&mut sql);
        }

        db_type.write_limit_offset(&mut sql, self.pagination.take, self.pagination.skip);

        (sql, params)
    }
}

/// Total-count query over the same source and filter as a select.
#[derive(Debug, Clone, PartialEq)]
pub struct CountQuery {
    from: TableRef,
    joins: Vec<Join>,
    filter: Filter,
}

impl CountQuery {
    /// Base table.
    pub fn from_table(&self) -> &TableRef {
        &self.from
    }

    /// Joins in declaration order.
    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    /// The filter.
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Check aliases and qualified columns.
    pub fn validate(&self) -> QueryResult<()> {
        validate_source(&self.from, &self.joins, &self.filter).map(|_| ())
    }

    /// Build the SQL statement.
    pub fn build_sql(&self, db_type: DatabaseType) -> (String, Vec<FilterValue>) {
        let mut params = Vec::new();
        let mut sql = String::from("SELECT COUNT(*)");
        write_source(&mut sql, &self.from, &self.joins, &self.filter, db_type, &mut params);
        (sql, params)
    }
}

fn write_source(
    sql: &mut String,
    from: &TableRef,
    joins: &[Join],
    filter: &Filter,
    db_type: DatabaseType,
    params: &mut Vec<FilterValue>,
) {
    sql.push_str(" FROM ");
    from.write_sql(sql);

    for join in joins {
        sql.push(' ');
        sql.push_str(join.kind.as_sql());
        sql.push(' ');
        join.table.write_sql(sql);
        sql.push_str(" ON ");
        sql.push_str(&join.left);
        sql.push_str(" = ");
        sql.push_str(&join.right);
    }

    if !filter.is_none() {
        sql.push_str(" WHERE ");
        sql.push_str(&filter.write_sql(db_type, params));
    }
}

fn validate_source<'a>(from: &'a TableRef, joins: &'a [Join], filter: &Filter) -> QueryResult<HashSet<&'a str>> {
    let mut aliases = HashSet::new();
    aliases.insert(from.alias.as_str());

    for join in joins {
        if !aliases.insert(join.table.alias.as_str()) {
            return Err(QueryError::invalid_select(format!(
                "table alias '{}' is declared twice",
                join.table.alias
            )));
        }
        check_qualifier(&join.left, &aliases)?;
        check_qualifier(&join.right, &aliases)?;
    }

    for column in filter.columns() {
        check_qualifier(column, &aliases)?;
    }

    Ok(aliases)
}

fn check_qualifier(column: &str, aliases: &HashSet<&str>) -> QueryResult<()> {
    match column.split_once('.') {
        Some((alias, _)) if !aliases.contains(alias) => Err(QueryError::unknown_column(column)),
        _ => Ok(()),
    }
}
