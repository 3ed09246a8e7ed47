//! # squad-query
//!
//! Query descriptors, filters and paging for the Squad data-access layer.
//!
//! This crate provides:
//! - Filters with SQL rendering and in-memory evaluation
//! - Projected select queries over outer-joined tables, and derived counts
//! - Ordering and offset/limit pagination with a [`Page`] result type
//! - The [`QueryEngine`] seam a record store implements
//! - An in-memory engine with call statistics
//! - A pager with two total-count strategies
//!
//! ## Filters
//!
//! ```rust
//! use squad_query::{Filter, FilterValue};
//!
//! let filter = Filter::and([
//!     Filter::Gte("m.age".into(), FilterValue::Int(35)),
//!     Filter::Equals("t.name".into(), "teamB".into()),
//! ]);
//!
//! // A conjunction of nothing matches everything.
//! assert!(Filter::and(Vec::new()).is_none());
//! # let _ = filter;
//! ```
//!
//! ## Paging
//!
//! ```rust
//! use squad_query::prelude::*;
//!
//! # tokio_test();
//! # fn tokio_test() {
//! # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! # rt.block_on(async {
//! let engine = MemoryEngine::new();
//! engine
//!     .create_table(&TableSchema::new(
//!         "member",
//!         [ColumnDef::id("id"), ColumnDef::required("username", ColumnType::Text)],
//!     ))
//!     .await?;
//! for name in ["member1", "member2", "member3", "member4"] {
//!     engine.insert("member", Row::new().with("username", name)).await?;
//! }
//!
//! let query = SelectQuery::new(TableRef::new("member")).columns_of("member", &["id", "username"]);
//! let request = PageRequest::of(0, 3)?;
//! let page: Page<Row> = fetch_page(&engine, &query, &request, PageStrategy::Optimized).await?;
//!
//! assert_eq!(page.number_of_elements(), 3);
//! assert_eq!(page.total(), 4);
//! # Ok::<(), QueryError>(())
//! # }).unwrap();
//! # }
//! ```

pub mod error;
pub mod filter;
pub mod logging;
pub mod memory;
pub mod pager;
pub mod pagination;
pub mod query;
pub mod row;
pub mod schema;
pub mod sql;
pub mod traits;
pub mod types;

pub use error::{ErrorCode, ErrorContext, QueryError, QueryResult};
pub use filter::{AndFilterBuilder, Filter, FilterValue};
pub use logging::{get_log_format, get_log_level, is_debug_enabled};
pub use memory::{EngineOp, EngineStats, MemoryEngine};
pub use pager::{PageStrategy, fetch_all, fetch_page, is_single_complete_page, map_rows};
pub use pagination::{Page, PageRequest, Pagination};
pub use query::{CountQuery, Join, JoinKind, SelectColumn, SelectQuery, TableRef};
pub use row::{FromRow, Row};
pub use schema::{ColumnDef, ColumnType, TableSchema};
pub use sql::DatabaseType;
pub use traits::{BoxFuture, Model, QueryEngine};
pub use types::{OrderBy, OrderByField, SortOrder};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{QueryError, QueryResult};
    pub use crate::filter::{Filter, FilterValue};
    pub use crate::memory::MemoryEngine;
    pub use crate::pager::{PageStrategy, fetch_all, fetch_page};
    pub use crate::pagination::{Page, PageRequest, Pagination};
    pub use crate::query::{CountQuery, SelectQuery, TableRef};
    pub use crate::row::{FromRow, Row};
    pub use crate::schema::{ColumnDef, ColumnType, TableSchema};
    pub use crate::traits::{Model, QueryEngine};
    pub use crate::types::{OrderBy, OrderByField, SortOrder};
}
