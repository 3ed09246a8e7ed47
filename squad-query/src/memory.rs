//! In-memory record store.
//!
//! [`MemoryEngine`] interprets [`SelectQuery`] and [`CountQuery`]
//! descriptors directly over rows held in memory: joins, three-valued
//! filtering, ordering (nulls first, ties keep insertion order) and
//! offset/limit windows. Base-table scans return rows in insertion order.
//!
//! Every call is counted in [`EngineStats`] so callers can assert how many
//! round trips an operation took, and one-shot failures can be injected per
//! operation with [`MemoryEngine::fail_next`].

use std::cmp::Ordering;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use futures::future;
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::error::{QueryError, QueryResult};
use crate::filter::{Filter, FilterValue};
use crate::query::{CountQuery, Join, JoinKind, SelectQuery, TableRef};
use crate::types::SortOrder;
use crate::row::Row;
use crate::schema::TableSchema;
use crate::sql::DatabaseType;
use crate::traits::{BoxFuture, QueryEngine};

/// Engine operations, used for call statistics and fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineOp {
    /// `insert`
    Insert,
    /// `query_many`
    QueryMany,
    /// `count`
    Count,
    /// `query_many_with_count`
    QueryManyWithCount,
}

/// Call counters.
#[derive(Debug, Default)]
pub struct EngineStats {
    inserts: AtomicU64,
    queries: AtomicU64,
    counts: AtomicU64,
    queries_with_count: AtomicU64,
}

impl EngineStats {
    fn counter(&self, op: EngineOp) -> &AtomicU64 {
        match op {
            EngineOp::Insert => &self.inserts,
            EngineOp::QueryMany => &self.queries,
            EngineOp::Count => &self.counts,
            EngineOp::QueryManyWithCount => &self.queries_with_count,
        }
    }

    fn record(&self, op: EngineOp) {
        self.counter(op).fetch_add(1, AtomicOrdering::Relaxed);
    }

    /// Number of calls made for `op`.
    pub fn calls(&self, op: EngineOp) -> u64 {
        self.counter(op).load(AtomicOrdering::Relaxed)
    }

    /// Number of read round trips of any kind.
    pub fn reads(&self) -> u64 {
        self.calls(EngineOp::QueryMany) + self.calls(EngineOp::Count) + self.calls(EngineOp::QueryManyWithCount)
    }

    /// Reset every counter to zero.
    pub fn reset(&self) {
        for op in [EngineOp::Insert, EngineOp::QueryMany, EngineOp::Count, EngineOp::QueryManyWithCount] {
            self.counter(op).store(0, AtomicOrdering::Relaxed);
        }
    }
}

struct Table {
    schema: TableSchema,
    rows: Vec<Row>,
    next_id: i64,
}

#[derive(Default)]
struct Inner {
    tables: RwLock<IndexMap<String, Table>>,
    stats: EngineStats,
    failures: Mutex<Vec<(EngineOp, QueryError)>>,
}

/// A record store held in process memory.
#[derive(Clone, Default)]
pub struct MemoryEngine {
    inner: Arc<Inner>,
}

impl MemoryEngine {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Call counters shared by every clone of this engine.
    pub fn stats(&self) -> &EngineStats {
        &self.inner.stats
    }

    /// Make the next call of `op` fail with `error`.
    pub fn fail_next(&self, op: EngineOp, error: QueryError) {
        self.inner.failures.lock().push((op, error));
    }

    /// Number of rows stored in `table`.
    pub fn row_count(&self, table: &str) -> usize {
        self.inner
            .tables
            .read()
            .get(table)
            .map(|t| t.rows.len())
            .unwrap_or(0)
    }

    fn begin(&self, op: EngineOp) -> QueryResult<()> {
        self.inner.stats.record(op);
        let mut failures = self.inner.failures.lock();
        match failures.iter().position(|(o, _)| *o == op) {
            Some(index) => Err(failures.remove(index).1),
            None => Ok(()),
        }
    }

    fn run_insert(&self, table: &str, values: Row) -> QueryResult<i64> {
        let mut tables = self.inner.tables.write();

        // Foreign keys are checked against a snapshot of referenced ids.
        let referenced = {
            let target = tables
                .get(table)
                .ok_or_else(|| no_such_table(table))?;
            let mut checks = Vec::new();
            for column in &target.schema.columns {
                if let (Some((ref_table, ref_column)), Some(value)) = (column.references, values.get(column.name)) {
                    if !value.is_null() {
                        checks.push((column.name, ref_table, ref_column, value.clone()));
                    }
                }
            }
            checks
        };
        for (column, ref_table, ref_column, value) in referenced {
            let exists = tables
                .get(ref_table)
                .is_some_and(|t| t.rows.iter().any(|r| r.get(ref_column) == Some(&value)));
            if !exists {
                return Err(QueryError::foreign_key_violation(format!(
                    "{}.{} references missing {}.{}",
                    table, column, ref_table, ref_column
                )));
            }
        }

        let target = tables
            .get_mut(table)
            .ok_or_else(|| no_such_table(table))?;

        for name in values.column_names() {
            if target.schema.column(name).is_none() {
                return Err(QueryError::database(format!(
                    "table {} has no column named {}",
                    table, name
                )));
            }
        }

        let mut row = Row::new();
        let mut id = None;
        for column in &target.schema.columns {
            let value = values.get(column.name).cloned().unwrap_or(FilterValue::Null);
            if column.primary_key {
                let assigned = match value {
                    FilterValue::Int(given) => {
                        if target.rows.iter().any(|r| r.get(column.name) == Some(&FilterValue::Int(given))) {
                            return Err(QueryError::unique_violation(table, column.name));
                        }
                        target.next_id = target.next_id.max(given);
                        given
                    }
                    _ => {
                        target.next_id += 1;
                        target.next_id
                    }
                };
                id = Some(assigned);
                row.insert(column.name, assigned);
                continue;
            }
            if value.is_null() && !column.nullable {
                return Err(QueryError::not_null_violation(format!("{}.{}", table, column.name)));
            }
            row.insert(column.name, value);
        }

        target.rows.push(row);
        let id = id.unwrap_or(target.rows.len() as i64);
        trace!(table = %table, id, "Inserted row");
        Ok(id)
    }

    fn run_select(&self, query: &SelectQuery) -> QueryResult<Vec<Row>> {
        query.validate()?;
        let tables = self.inner.tables.read();
        let scopes = matching_scopes(&tables, query.from_table(), query.joins(), query.filter())?;

        let order = query.ordering().fields();
        let mut keyed = Vec::with_capacity(scopes.len());
        for scope in scopes {
            let mut keys = Vec::with_capacity(order.len());
            for field in order {
                let source = query
                    .select_columns()
                    .iter()
                    .find(|c| c.alias == field.column)
                    .map(|c| c.column.as_str())
                    .unwrap_or(field.column.as_str());
                keys.push(lookup(&scope, source)?);
            }
            keyed.push((keys, scope));
        }

        if !order.is_empty() {
            keyed.sort_by(|(a, _), (b, _)| {
                for (i, field) in order.iter().enumerate() {
                    let ordering = a[i].sort_cmp(&b[i]);
                    let ordering = match field.order {
                        SortOrder::Asc => ordering,
                        SortOrder::Desc => ordering.reverse(),
                    };
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });
        }

        let window = query.pagination().apply(keyed);
        let mut rows = Vec::with_capacity(window.len());
        for (_, scope) in window {
            let mut row = Row::new();
            for column in query.select_columns() {
                row.insert(column.alias.clone(), lookup(&scope, &column.column)?);
            }
            rows.push(row);
        }

        debug!(table = %query.from_table().name, rows = rows.len(), "Memory select");
        Ok(rows)
    }

    fn run_count(&self, query: &CountQuery) -> QueryResult<u64> {
        query.validate()?;
        let tables = self.inner.tables.read();
        let scopes = matching_scopes(&tables, query.from_table(), query.joins(), query.filter())?;
        debug!(table = %query.from_table().name, total = scopes.len(), "Memory count");
        Ok(scopes.len() as u64)
    }
}

impl QueryEngine for MemoryEngine {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::SQLite
    }

    fn create_table(&self, schema: &TableSchema) -> BoxFuture<'_, QueryResult<()>> {
        let mut tables = self.inner.tables.write();
        tables.entry(schema.name.to_string()).or_insert_with(|| Table {
            schema: schema.clone(),
            rows: Vec::new(),
            next_id: 0,
        });
        Box::pin(future::ready(Ok(())))
    }

    fn insert(&self, table: &str, values: Row) -> BoxFuture<'_, QueryResult<i64>> {
        let result = self
            .begin(EngineOp::Insert)
            .and_then(|_| self.run_insert(table, values));
        Box::pin(future::ready(result))
    }

    fn query_many(&self, query: &SelectQuery) -> BoxFuture<'_, QueryResult<Vec<Row>>> {
        let result = self
            .begin(EngineOp::QueryMany)
            .and_then(|_| self.run_select(query));
        Box::pin(future::ready(result))
    }

    fn count(&self, query: &CountQuery) -> BoxFuture<'_, QueryResult<u64>> {
        let result = self
            .begin(EngineOp::Count)
            .and_then(|_| self.run_count(query));
        Box::pin(future::ready(result))
    }

    fn query_many_with_count(&self, query: &SelectQuery) -> BoxFuture<'_, QueryResult<(Vec<Row>, u64)>> {
        let result = self.begin(EngineOp::QueryManyWithCount).and_then(|_| {
            let rows = self.run_select(query)?;
            let total = self.run_count(&query.count_query())?;
            Ok((rows, total))
        });
        Box::pin(future::ready(result))
    }
}

/// One table's contribution to a joined row.
struct Binding<'a> {
    alias: &'a str,
    schema: &'a TableSchema,
    row: Option<&'a Row>,
}

type Scope<'a> = Vec<Binding<'a>>;

fn no_such_table(table: &str) -> QueryError {
    QueryError::database(format!("no such table: {}", table))
}

fn matching_scopes<'a>(
    tables: &'a IndexMap<String, Table>,
    from: &'a TableRef,
    joins: &'a [Join],
    filter: &Filter,
) -> QueryResult<Vec<Scope<'a>>> {
    let base = tables.get(&from.name).ok_or_else(|| no_such_table(&from.name))?;
    let mut scopes: Vec<Scope<'a>> = base
        .rows
        .iter()
        .map(|row| {
            vec![Binding {
                alias: from.alias.as_str(),
                schema: &base.schema,
                row: Some(row),
            }]
        })
        .collect();

    for join in joins {
        let joined = tables
            .get(&join.table.name)
            .ok_or_else(|| no_such_table(&join.table.name))?;
        let mut next = Vec::with_capacity(scopes.len());
        for scope in scopes {
            let mut matched = false;
            for candidate in &joined.rows {
                let mut extended = clone_scope(&scope);
                extended.push(Binding {
                    alias: join.table.alias.as_str(),
                    schema: &joined.schema,
                    row: Some(candidate),
                });
                let left = lookup(&extended, &join.left)?;
                let right = lookup(&extended, &join.right)?;
                if left.compare(&right)? == Some(Ordering::Equal) {
                    matched = true;
                    next.push(extended);
                }
            }
            if !matched && join.kind == JoinKind::Left {
                let mut extended = scope;
                extended.push(Binding {
                    alias: join.table.alias.as_str(),
                    schema: &joined.schema,
                    row: None,
                });
                next.push(extended);
            }
        }
        scopes = next;
    }

    if filter.is_none() {
        return Ok(scopes);
    }

    let mut matching = Vec::with_capacity(scopes.len());
    for scope in scopes {
        if filter.evaluate(&|column: &str| lookup(&scope, column))? == Some(true) {
            matching.push(scope);
        }
    }
    Ok(matching)
}

fn clone_scope<'a>(scope: &[Binding<'a>]) -> Scope<'a> {
    scope
        .iter()
        .map(|b| Binding {
            alias: b.alias,
            schema: b.schema,
            row: b.row,
        })
        .collect()
}

fn lookup(scope: &[Binding<'_>], column: &str) -> QueryResult<FilterValue> {
    let binding = match column.split_once('.') {
        Some((alias, name)) => scope
            .iter()
            .find(|b| b.alias == alias && b.schema.column(name).is_some())
            .map(|b| (b, name)),
        None => {
            let mut candidates = scope.iter().filter(|b| b.schema.column(column).is_some());
            let first = candidates.next();
            if first.is_some() && candidates.next().is_some() {
                return Err(QueryError::invalid_filter(format!("ambiguous column name: {}", column)));
            }
            first.map(|b| (b, column))
        }
    };

    let (binding, name) = binding.ok_or_else(|| QueryError::unknown_column(column))?;
    Ok(binding
        .row
        .and_then(|row| row.get(name))
        .cloned()
        .unwrap_or(FilterValue::Null))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::schema::{ColumnDef, ColumnType};
    use crate::types::OrderByField;
    use pretty_assertions::assert_eq;

    fn team_schema() -> TableSchema {
        TableSchema::new(
            "team",
            [ColumnDef::id("id"), ColumnDef::required("name", ColumnType::Text)],
        )
    }

    fn member_schema() -> TableSchema {
        TableSchema::new(
            "member",
            [
                ColumnDef::id("id"),
                ColumnDef::optional("username", ColumnType::Text),
                ColumnDef::required("age", ColumnType::Integer),
                ColumnDef::optional("team_id", ColumnType::Integer).references("team", "id"),
            ],
        )
    }

    async fn seeded() -> MemoryEngine {
        let engine = MemoryEngine::new();
        engine.create_table(&team_schema()).await.unwrap();
        engine.create_table(&member_schema()).await.unwrap();

        let a = engine.insert("team", Row::new().with("name", "teamA")).await.unwrap();
        let b = engine.insert("team", Row::new().with("name", "teamB")).await.unwrap();
        for (name, age, team) in [
            ("member1", 10, Some(a)),
            ("member2", 20, Some(a)),
            ("member3", 30, Some(b)),
            ("member4", 40, Some(b)),
            ("loner", 50, None),
        ] {
            engine
                .insert(
                    "member",
                    Row::new().with("username", name).with("age", age).with("team_id", team),
                )
                .await
                .unwrap();
        }
        engine.stats().reset();
        engine
    }

    fn member_team() -> SelectQuery {
        SelectQuery::new(TableRef::aliased("member", "m"))
            .left_join(TableRef::aliased("team", "t"), "m.team_id", "t.id")
            .column("m.id", "member_id")
            .column("m.username", "username")
            .column("t.name", "team_name")
    }

    fn usernames(rows: &[Row]) -> Vec<String> {
        rows.iter().map(|r| r.get_string("username").unwrap()).collect()
    }

    #[tokio::test]
    async fn test_left_join_keeps_unmatched_rows() {
        let engine = seeded().await;
        let rows = engine.query_many(&member_team()).await.unwrap();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[4].get("team_name"), Some(&FilterValue::Null));
        assert_eq!(
            usernames(&rows),
            vec!["member1", "member2", "member3", "member4", "loner"]
        );
    }

    #[tokio::test]
    async fn test_inner_join_drops_unmatched_rows() {
        let engine = seeded().await;
        let query = SelectQuery::new(TableRef::aliased("member", "m"))
            .inner_join(TableRef::aliased("team", "t"), "m.team_id", "t.id")
            .column("m.username", "username");
        assert_eq!(engine.query_many(&query).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_filter_on_joined_column() {
        let engine = seeded().await;
        let query = member_team().r#where(Filter::and([
            Filter::Gte("m.age".into(), 35.into()),
            Filter::Lte("m.age".into(), 40.into()),
            Filter::Equals("t.name".into(), "teamB".into()),
        ]));
        let rows = engine.query_many(&query).await.unwrap();
        assert_eq!(usernames(&rows), vec!["member4"]);
    }

    #[tokio::test]
    async fn test_order_and_window() {
        let engine = seeded().await;
        let query = member_team()
            .order_by(OrderByField::desc("member_id"))
            .skip(1)
            .take(2);
        let rows = engine.query_many(&query).await.unwrap();
        assert_eq!(usernames(&rows), vec!["member4", "member3"]);
    }

    #[tokio::test]
    async fn test_order_nulls_first() {
        let engine = seeded().await;
        let query = member_team().order_by(OrderByField::asc("t.name")).take(1);
        let rows = engine.query_many(&query).await.unwrap();
        assert_eq!(usernames(&rows), vec!["loner"]);
    }

    #[tokio::test]
    async fn test_count_ignores_window() {
        let engine = seeded().await;
        let query = member_team()
            .r#where(Filter::Equals("t.name".into(), "teamA".into()))
            .take(1);
        assert_eq!(engine.count(&query.count_query()).await.unwrap(), 2);
        assert_eq!(engine.stats().calls(EngineOp::Count), 1);
    }

    #[tokio::test]
    async fn test_query_with_count_is_one_call() {
        let engine = seeded().await;
        let (rows, total) = engine.query_many_with_count(&member_team().take(2)).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(total, 5);
        assert_eq!(engine.stats().reads(), 1);
    }

    #[tokio::test]
    async fn test_unknown_column_is_construction_error() {
        let engine = seeded().await;
        let err = engine
            .query_many(&member_team().r#where(Filter::Equals("nickname".into(), "x".into())))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownColumn);
    }

    #[tokio::test]
    async fn test_ambiguous_column() {
        let engine = seeded().await;
        let err = engine
            .query_many(&member_team().r#where(Filter::Equals("id".into(), 1.into())))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFilter);
    }

    #[tokio::test]
    async fn test_insert_constraints() {
        let engine = seeded().await;

        let err = engine
            .insert("member", Row::new().with("username", "x").with("age", 1).with("team_id", 99i64))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ForeignKeyConstraint);

        let err = engine
            .insert("member", Row::new().with("username", "x"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotNullConstraint);

        let err = engine
            .insert("member", Row::new().with("id", 1i64).with("age", 1))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::UniqueConstraint);

        let err = engine.insert("nope", Row::new()).await.unwrap_err();
        assert!(err.is_store_error());
    }

    #[tokio::test]
    async fn test_generated_ids_follow_explicit_ids() {
        let engine = seeded().await;
        let id = engine
            .insert("team", Row::new().with("id", 10i64).with("name", "teamC"))
            .await
            .unwrap();
        assert_eq!(id, 10);
        let next = engine.insert("team", Row::new().with("name", "teamD")).await.unwrap();
        assert_eq!(next, 11);
        assert_eq!(engine.row_count("team"), 4);
    }

    #[tokio::test]
    async fn test_injected_failure_is_one_shot() {
        let engine = seeded().await;
        engine.fail_next(EngineOp::Count, QueryError::timeout(250));

        let err = engine.count(&member_team().count_query()).await.unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(engine.count(&member_team().count_query()).await.unwrap(), 5);
        assert_eq!(engine.stats().calls(EngineOp::Count), 2);
    }
}
