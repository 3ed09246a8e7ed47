//! SQLite record store for Squad.
//!
//! Implements [`squad_query::QueryEngine`] on `tokio-rusqlite`, so every
//! statement runs on the connection's own thread without blocking the async
//! runtime.
//!
//! # Example
//!
//! ```rust,no_run
//! use squad_query::prelude::*;
//! use squad_sqlite::{SqliteConfig, SqliteEngine};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = SqliteEngine::open(SqliteConfig::from_url("sqlite://./squad.db")?).await?;
//!
//! let query = SelectQuery::new(TableRef::aliased("member", "m"))
//!     .column("m.username", "username")
//!     .r#where(Filter::Gte("m.age".into(), FilterValue::Int(20)));
//! let page: Page<Row> =
//!     fetch_page(&engine, &query, &PageRequest::of(0, 10)?, PageStrategy::Simple).await?;
//! # let _ = page;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod types;

pub use config::{DatabasePath, JournalMode, SqliteConfig, SynchronousMode};
pub use engine::SqliteEngine;
pub use error::{SqliteError, SqliteResult};
