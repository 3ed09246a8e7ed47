//! Top-level error type.

use thiserror::Error;

use squad_query::error::QueryError;

use crate::config::ConfigError;

/// Result type for setup and repository calls.
pub type Result<T> = std::result::Result<T, Error>;

/// Any failure while configuring or using Squad.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or unreadable configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Query construction, store or lookup failure.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// The SQLite store could not be opened.
    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    Sqlite(#[from] squad_sqlite::SqliteError),
}
