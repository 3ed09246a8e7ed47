//! Error types for SQLite operations.

use rusqlite::ffi;
use thiserror::Error;

use squad_query::error::{ErrorCode, QueryError};

/// Result type for SQLite operations.
pub type SqliteResult<T> = Result<T, SqliteError>;

/// Error type for SQLite operations.
#[derive(Debug, Error)]
pub enum SqliteError {
    /// SQLite driver error.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] tokio_rusqlite::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A stored value could not be read back.
    #[error("Type conversion error: {0}")]
    TypeConversion(String),
}

impl SqliteError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a type conversion error.
    pub fn type_conversion(msg: impl Into<String>) -> Self {
        Self::TypeConversion(msg.into())
    }
}

impl From<rusqlite::Error> for SqliteError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Sqlite(tokio_rusqlite::Error::Rusqlite(err))
    }
}

impl From<SqliteError> for QueryError {
    fn from(err: SqliteError) -> Self {
        match err {
            SqliteError::Sqlite(tokio_rusqlite::Error::Rusqlite(e)) => from_rusqlite(&e),
            SqliteError::Sqlite(tokio_rusqlite::Error::ConnectionClosed) => {
                QueryError::connection("connection closed")
            }
            SqliteError::Sqlite(e) => QueryError::database(e.to_string()),
            SqliteError::Config(msg) => QueryError::connection(format!("config: {}", msg)),
            SqliteError::TypeConversion(msg) => QueryError::deserialization(msg),
        }
    }
}

fn from_rusqlite(err: &rusqlite::Error) -> QueryError {
    let rusqlite::Error::SqliteFailure(failure, message) = err else {
        return QueryError::database(err.to_string());
    };
    let message = message.clone().unwrap_or_else(|| failure.to_string());

    match failure.code {
        rusqlite::ErrorCode::ConstraintViolation => match failure.extended_code {
            ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                let (table, column) = constraint_target(&message);
                QueryError::unique_violation(table, column)
            }
            ffi::SQLITE_CONSTRAINT_FOREIGNKEY => QueryError::foreign_key_violation(message),
            ffi::SQLITE_CONSTRAINT_NOTNULL => {
                let (table, column) = constraint_target(&message);
                QueryError::not_null_violation(format!("{}.{}", table, column))
            }
            _ => QueryError::database(message),
        },
        rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked => {
            QueryError::new(ErrorCode::QueryTimeout, format!("Database busy: {}", message))
        }
        rusqlite::ErrorCode::CannotOpen => QueryError::connection(message),
        _ => match message.strip_prefix("no such column: ") {
            Some(column) => QueryError::unknown_column(column),
            None => QueryError::database(message),
        },
    }
}

/// `"UNIQUE constraint failed: member.id"` → `("member", "id")`.
fn constraint_target(message: &str) -> (&str, &str) {
    message
        .rsplit_once(": ")
        .and_then(|(_, target)| target.split_once('.'))
        .unwrap_or(("record", message))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(code: i32, message: &str) -> SqliteError {
        rusqlite::Error::SqliteFailure(ffi::Error::new(code), Some(message.to_string())).into()
    }

    #[test]
    fn test_error_display() {
        let err = SqliteError::config("invalid path");
        assert_eq!(err.to_string(), "Configuration error: invalid path");
    }

    #[test]
    fn test_constraint_mapping() {
        let err: QueryError = failure(ffi::SQLITE_CONSTRAINT_UNIQUE, "UNIQUE constraint failed: team.name").into();
        assert_eq!(err.code, ErrorCode::UniqueConstraint);

        let err: QueryError = failure(ffi::SQLITE_CONSTRAINT_FOREIGNKEY, "FOREIGN KEY constraint failed").into();
        assert_eq!(err.code, ErrorCode::ForeignKeyConstraint);

        let err: QueryError = failure(ffi::SQLITE_CONSTRAINT_NOTNULL, "NOT NULL constraint failed: member.age").into();
        assert_eq!(err.code, ErrorCode::NotNullConstraint);
        assert!(err.is_constraint_violation());
    }

    #[test]
    fn test_busy_is_timeout() {
        let err: QueryError = failure(ffi::SQLITE_BUSY, "database is locked").into();
        assert!(err.is_timeout());
        assert!(err.is_store_error());
    }

    #[test]
    fn test_no_such_column() {
        let err: QueryError = failure(ffi::SQLITE_ERROR, "no such column: m.nickname").into();
        assert_eq!(err.code, ErrorCode::UnknownColumn);
        assert!(err.is_query_construction());
    }

    #[test]
    fn test_conversion_errors() {
        let err: QueryError = SqliteError::type_conversion("blob in text column").into();
        assert_eq!(err.code, ErrorCode::DeserializationError);

        let err: QueryError = SqliteError::from(tokio_rusqlite::Error::ConnectionClosed).into();
        assert_eq!(err.code, ErrorCode::ConnectionFailed);
    }

    #[test]
    fn test_constraint_target() {
        assert_eq!(constraint_target("UNIQUE constraint failed: member.id"), ("member", "id"));
        assert_eq!(constraint_target("odd"), ("record", "odd"));
    }
}
