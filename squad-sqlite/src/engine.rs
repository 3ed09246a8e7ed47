//! SQLite query engine implementation.

use rusqlite::types::Value;
use rusqlite::params_from_iter;
use tokio_rusqlite::Connection;
use tracing::{debug, info, instrument};

use squad_query::error::QueryResult;
use squad_query::filter::FilterValue;
use squad_query::query::{CountQuery, SelectQuery};
use squad_query::row::Row;
use squad_query::schema::TableSchema;
use squad_query::sql::DatabaseType;
use squad_query::traits::{BoxFuture, QueryEngine};

use crate::config::{DatabasePath, SqliteConfig};
use crate::error::{SqliteError, SqliteResult};
use crate::types::{from_sqlite, to_sqlite_params};

/// Output column carrying the windowed total count.
const TOTAL_COLUMN: &str = "__squad_total";

/// SQLite query engine.
///
/// All clones share one connection; statements run one at a time on the
/// connection's background thread.
#[derive(Clone)]
pub struct SqliteEngine {
    conn: Connection,
    config: SqliteConfig,
}

impl SqliteEngine {
    /// Open a database and apply the configured pragmas.
    #[instrument(skip(config), fields(memory = config.path.is_memory()))]
    pub async fn open(config: SqliteConfig) -> SqliteResult<Self> {
        let conn = match &config.path {
            DatabasePath::Memory => Connection::open_in_memory().await?,
            DatabasePath::File(path) => Connection::open(path).await?,
        };

        let init = config.init_sql();
        conn.call(move |conn| Ok(conn.execute_batch(&init)?)).await?;

        info!(path = ?config.path, "SQLite database opened");
        Ok(Self { conn, config })
    }

    /// Open a private in-memory database.
    pub async fn memory() -> SqliteResult<Self> {
        Self::open(SqliteConfig::memory()).await
    }

    /// Open the database named by a URL (see [`SqliteConfig::from_url`]).
    pub async fn connect(url: &str) -> SqliteResult<Self> {
        Self::open(SqliteConfig::from_url(url)?).await
    }

    /// The configuration this engine was opened with.
    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    /// Execute one or more statements without results.
    pub async fn execute_batch(&self, sql: impl Into<String>) -> SqliteResult<()> {
        let sql = sql.into();
        debug!(sql = %sql, "Executing batch");
        self.conn
            .call(move |conn| Ok(conn.execute_batch(&sql)?))
            .await
            .map_err(SqliteError::from)
    }

    #[instrument(skip(self, params), fields(params = params.len()))]
    async fn fetch_rows(&self, sql: String, params: Vec<FilterValue>) -> SqliteResult<Vec<Row>> {
        debug!(sql = %sql, "Executing query");
        let params = to_sqlite_params(&params);

        let raw = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
                let rows = stmt.query_map(params_from_iter(params.iter()), |row| {
                    let mut values = Vec::with_capacity(columns.len());
                    for (i, name) in columns.iter().enumerate() {
                        values.push((name.clone(), row.get::<_, Value>(i)?));
                    }
                    Ok(values)
                })?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            })
            .await?;

        raw.into_iter()
            .map(|values| {
                values
                    .into_iter()
                    .map(|(name, value)| Ok((name, from_sqlite(value)?)))
                    .collect::<SqliteResult<Row>>()
            })
            .collect()
    }

    #[instrument(skip(self, params), fields(params = params.len()))]
    async fn fetch_count(&self, sql: String, params: Vec<FilterValue>) -> SqliteResult<u64> {
        debug!(sql = %sql, "Executing count");
        let params = to_sqlite_params(&params);

        let count = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                Ok(stmt.query_row(params_from_iter(params.iter()), |row| row.get::<_, i64>(0))?)
            })
            .await?;

        u64::try_from(count).map_err(|_| SqliteError::type_conversion(format!("negative count {}", count)))
    }

    #[instrument(skip(self, values), fields(table = %table))]
    async fn insert_row(&self, table: String, values: Row) -> SqliteResult<i64> {
        let (columns, params): (Vec<String>, Vec<FilterValue>) = values.into_iter().unzip();
        let sql = if columns.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", table)
        } else {
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table,
                columns.join(", "),
                vec!["?"; columns.len()].join(", ")
            )
        };
        debug!(sql = %sql, "Executing insert");
        let params = to_sqlite_params(&params);

        self.conn
            .call(move |conn| {
                conn.execute(&sql, params_from_iter(params.iter()))?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(SqliteError::from)
    }
}

impl QueryEngine for SqliteEngine {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::SQLite
    }

    fn create_table(&self, schema: &TableSchema) -> BoxFuture<'_, QueryResult<()>> {
        let sql = schema.to_create_sql(DatabaseType::SQLite);
        Box::pin(async move { Ok(self.execute_batch(sql).await?) })
    }

    fn insert(&self, table: &str, values: Row) -> BoxFuture<'_, QueryResult<i64>> {
        let table = table.to_string();
        Box::pin(async move { Ok(self.insert_row(table, values).await?) })
    }

    fn query_many(&self, query: &SelectQuery) -> BoxFuture<'_, QueryResult<Vec<Row>>> {
        let prepared = query.validate().map(|_| query.build_sql(DatabaseType::SQLite));
        Box::pin(async move {
            let (sql, params) = prepared?;
            Ok(self.fetch_rows(sql, params).await?)
        })
    }

    fn count(&self, query: &CountQuery) -> BoxFuture<'_, QueryResult<u64>> {
        let prepared = query.validate().map(|_| query.build_sql(DatabaseType::SQLite));
        Box::pin(async move {
            let (sql, params) = prepared?;
            Ok(self.fetch_count(sql, params).await?)
        })
    }

    /// One statement: the page rows carry `COUNT(*) OVER ()`.
    ///
    /// A page past the end has no row to carry the total, so that case
    /// falls back to a count query unless the window starts at 0.
    fn query_many_with_count(&self, query: &SelectQuery) -> BoxFuture<'_, QueryResult<(Vec<Row>, u64)>> {
        let prepared = query
            .validate()
            .map(|_| query.build_sql_with_total(DatabaseType::SQLite, TOTAL_COLUMN));
        let count_query = query.count_query();
        let offset = query.pagination().offset();

        Box::pin(async move {
            let (sql, params) = prepared?;
            let mut rows = self.fetch_rows(sql, params).await?;

            let total = match rows.first() {
                Some(row) => u64::try_from(row.get_i64(TOTAL_COLUMN)?).unwrap_or(0),
                None if offset == 0 => 0,
                None => {
                    debug!(offset, "Page past the end, counting separately");
                    let (sql, params) = count_query.build_sql(DatabaseType::SQLite);
                    self.fetch_count(sql, params).await?
                }
            };

            for row in &mut rows {
                row.remove(TOTAL_COLUMN);
            }
            Ok((rows, total))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use squad_query::error::ErrorCode;
    use squad_query::filter::Filter;
    use squad_query::query::TableRef;
    use squad_query::schema::{ColumnDef, ColumnType};
    use squad_query::types::OrderByField;

    async fn seeded() -> SqliteEngine {
        let engine = SqliteEngine::memory().await.unwrap();
        engine
            .create_table(&TableSchema::new(
                "team",
                [ColumnDef::id("id"), ColumnDef::required("name", ColumnType::Text)],
            ))
            .await
            .unwrap();
        engine
            .create_table(&TableSchema::new(
                "member",
                [
                    ColumnDef::id("id"),
                    ColumnDef::optional("username", ColumnType::Text),
                    ColumnDef::required("age", ColumnType::Integer),
                    ColumnDef::optional("team_id", ColumnType::Integer).references("team", "id"),
                ],
            ))
            .await
            .unwrap();

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
        engine
    }

    fn member_team() -> SelectQuery {
        SelectQuery::new(TableRef::aliased("member", "m"))
            .left_join(TableRef::aliased("team", "t"), "m.team_id", "t.id")
            .column("m.id", "member_id")
            .column("m.username", "username")
            .column("t.name", "team_name")
            .order_by(OrderByField::asc("member_id"))
    }

    fn usernames(rows: &[Row]) -> Vec<String> {
        rows.iter().map(|r| r.get_string("username").unwrap()).collect()
    }

    #[tokio::test]
    async fn test_left_join_and_filter() {
        let engine = seeded().await;

        let rows = engine.query_many(&member_team()).await.unwrap();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[4].get("team_name"), Some(&FilterValue::Null));

        let query = member_team().r#where(Filter::and([
            Filter::Gte("m.age".into(), 35.into()),
            Filter::Lte("m.age".into(), 40.into()),
            Filter::Equals("t.name".into(), "teamB".into()),
        ]));
        assert_eq!(usernames(&engine.query_many(&query).await.unwrap()), vec!["member4"]);
    }

    #[tokio::test]
    async fn test_count() {
        let engine = seeded().await;
        let query = member_team().r#where(Filter::Equals("t.name".into(), "teamA".into()));
        assert_eq!(engine.count(&query.count_query()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_query_with_windowed_total() {
        let engine = seeded().await;
        let (rows, total) = engine
            .query_many_with_count(&member_team().skip(1).take(2))
            .await
            .unwrap();

        assert_eq!(usernames(&rows), vec!["member2", "member3"]);
        assert_eq!(total, 5);
        assert!(!rows[0].contains(TOTAL_COLUMN));
        assert_eq!(rows[0].len(), 3);
    }

    #[tokio::test]
    async fn test_query_with_count_past_the_end() {
        let engine = seeded().await;
        let (rows, total) = engine
            .query_many_with_count(&member_team().skip(10).take(2))
            .await
            .unwrap();
        assert!(rows.is_empty());
        assert_eq!(total, 5);

        let nobody = member_team().r#where(Filter::Equals("m.username".into(), "ghost".into()));
        let (rows, total) = engine.query_many_with_count(&nobody.take(3)).await.unwrap();
        assert!(rows.is_empty());
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_huge_page_index_is_an_empty_page() {
        use squad_query::pager::{PageStrategy, fetch_page};
        use squad_query::pagination::PageRequest;

        let engine = seeded().await;
        let request = PageRequest::of(u64::MAX / 2, 4).unwrap();
        for strategy in [PageStrategy::Simple, PageStrategy::Optimized] {
            let page = fetch_page::<_, Row>(&engine, &member_team(), &request, strategy)
                .await
                .unwrap();
            assert!(page.is_empty(), "{}", strategy);
            assert_eq!(page.total(), 5, "{}", strategy);
        }

        let huge = PageRequest::of(0, u64::MAX).unwrap();
        let page = fetch_page::<_, Row>(&engine, &member_team(), &huge, PageStrategy::Simple)
            .await
            .unwrap();
        assert_eq!(page.number_of_elements(), 5);
        assert_eq!(page.total(), 5);
    }

    #[tokio::test]
    async fn test_offset_without_limit() {
        let engine = seeded().await;
        let rows = engine.query_many(&member_team().skip(3)).await.unwrap();
        assert_eq!(usernames(&rows), vec!["member4", "loner"]);
    }

    #[tokio::test]
    async fn test_constraint_errors() {
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
            .insert("team", Row::new().with("id", 1i64).with("name", "dup"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::UniqueConstraint);
    }

    #[tokio::test]
    async fn test_unknown_column() {
        let engine = seeded().await;
        let query = member_team().r#where(Filter::Equals("m.nickname".into(), "x".into()));
        let err = engine.query_many(&query).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownColumn);

        let query = member_team().r#where(Filter::Equals("z.name".into(), "x".into()));
        let err = engine.count(&query.count_query()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownColumn);
    }

    #[tokio::test]
    async fn test_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("squad.db").display());

        {
            let engine = SqliteEngine::connect(&url).await.unwrap();
            engine.execute_batch("CREATE TABLE note (body TEXT)").await.unwrap();
            engine.insert("note", Row::new().with("body", "kept")).await.unwrap();
        }

        let engine = SqliteEngine::connect(&url).await.unwrap();
        let query = SelectQuery::new(TableRef::new("note")).columns_of("note", &["body"]);
        let rows = engine.query_many(&query).await.unwrap();
        assert_eq!(rows[0].get_string("body").unwrap(), "kept");
    }
}
