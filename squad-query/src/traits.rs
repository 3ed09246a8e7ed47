//! Core traits: models and the record-store seam.

use std::future::Future;
use std::pin::Pin;

use crate::error::QueryResult;
use crate::query::{CountQuery, SelectQuery};
use crate::row::{FromRow, Row};
use crate::schema::TableSchema;
use crate::sql::DatabaseType;

/// A boxed future returned by engine methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A persisted record type.
pub trait Model: FromRow + Send + 'static {
    /// The model name (used in errors).
    const MODEL_NAME: &'static str;
    /// The table name.
    const TABLE_NAME: &'static str;
    /// The generated primary key column.
    const PRIMARY_KEY: &'static str;
    /// All columns in declaration order.
    const COLUMNS: &'static [&'static str];

    /// Table definition.
    fn schema() -> TableSchema;

    /// Values to insert. The primary key is omitted while unassigned.
    fn to_row(&self) -> Row;
}

/// The record store a query runs against.
///
/// Engines are cheap handles: cloning one shares the same store. Every
/// method is one logical round trip; nothing here retries, and store
/// failures are returned as they happen.
pub trait QueryEngine: Clone + Send + Sync + 'static {
    /// Dialect used to render statements.
    fn database_type(&self) -> DatabaseType;

    /// Create a table if it does not exist.
    fn create_table(&self, schema: &TableSchema) -> BoxFuture<'_, QueryResult<()>>;

    /// Insert a row, returning the generated (or given) primary key.
    fn insert(&self, table: &str, values: Row) -> BoxFuture<'_, QueryResult<i64>>;

    /// Run a select and return its rows.
    fn query_many(&self, query: &SelectQuery) -> BoxFuture<'_, QueryResult<Vec<Row>>>;

    /// Count matching rows.
    fn count(&self, query: &CountQuery) -> BoxFuture<'_, QueryResult<u64>>;

    /// Run a select and also return the total match count ignoring the
    /// query's window.
    ///
    /// The default issues two calls. Engines that can answer both in one
    /// round trip override it.
    fn query_many_with_count(&self, query: &SelectQuery) -> BoxFuture<'_, QueryResult<(Vec<Row>, u64)>> {
        let query = query.clone();
        Box::pin(async move {
            let rows = self.query_many(&query).await?;
            let total = self.count(&query.count_query()).await?;
            Ok((rows, total))
        })
    }
}
