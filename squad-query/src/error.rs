//! Error types for query construction and record-store execution.
//!
//! Every failure surfaced by this crate is a [`QueryError`] carrying an
//! [`ErrorCode`]. Codes fall into three kinds:
//!
//! - **Query construction** (1xxx): the query cannot be expressed, for example
//!   a constraint references an unknown column or the page size is zero.
//! - **Not found** (`RecordNotFound`): only raised by single-record lookups.
//!   Searches return empty results instead.
//! - **Store errors** (2xxx, 3xxx, 5xxx, 6xxx): anything the backing record
//!   store reports. These propagate unchanged, nothing here retries.
//!
//! Error codes follow a pattern: S{category}{number}
//!
//! ```rust
//! use squad_query::{QueryError, ErrorCode};
//!
//! let err = QueryError::not_found("Member");
//! assert_eq!(err.code, ErrorCode::RecordNotFound);
//! assert!(err.to_string().contains("Member"));
//!
//! let err = QueryError::unknown_column("t.nickname");
//! assert!(err.is_query_construction());
//! assert!(!err.is_store_error());
//! ```

use std::fmt;
use thiserror::Error;

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Lookup and construction errors (1xxx)
    /// Record not found (S1001).
    RecordNotFound = 1001,
    /// Invalid filter or where clause (S1003).
    InvalidFilter = 1003,
    /// Invalid projection, join or ordering (S1004).
    InvalidSelect = 1004,
    /// Invalid offset/limit or page request (S1006).
    InvalidPagination = 1006,
    /// A constraint or ordering names a column the query cannot see (S1007).
    UnknownColumn = 1007,

    // Constraint errors (2xxx)
    /// Unique constraint violation (S2001).
    UniqueConstraint = 2001,
    /// Foreign key constraint violation (S2002).
    ForeignKeyConstraint = 2002,
    /// Not null constraint violation (S2004).
    NotNullConstraint = 2004,

    // Connection errors (3xxx)
    /// Database connection failed (S3001).
    ConnectionFailed = 3001,

    // Query execution errors (5xxx)
    /// Query timeout (S5001).
    QueryTimeout = 5001,
    /// General database error (S5005).
    DatabaseError = 5005,

    // Data errors (6xxx)
    /// Deserialization error (S6003).
    DeserializationError = 6003,
}

impl ErrorCode {
    /// Get the error code string (e.g., "S1001").
    pub fn code(&self) -> String {
        format!("S{}", *self as u16)
    }

    /// Get a short description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::RecordNotFound => "Record not found",
            Self::InvalidFilter => "Invalid filter condition",
            Self::InvalidSelect => "Invalid select, join or ordering",
            Self::InvalidPagination => "Invalid pagination",
            Self::UnknownColumn => "Unknown column",
            Self::UniqueConstraint => "Unique constraint violation",
            Self::ForeignKeyConstraint => "Foreign key constraint violation",
            Self::NotNullConstraint => "Not null constraint violation",
            Self::ConnectionFailed => "Database connection failed",
            Self::QueryTimeout => "Query timeout",
            Self::DatabaseError => "Database error",
            Self::DeserializationError => "Deserialization error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Additional context for an error.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation that was being performed.
    pub operation: Option<String>,
    /// The model involved.
    pub model: Option<String>,
    /// The column involved.
    pub field: Option<String>,
    /// The SQL statement (if available).
    pub sql: Option<String>,
    /// Suggestions for fixing the error.
    pub suggestions: Vec<String>,
}

/// Errors that can occur during query construction or execution.
#[derive(Error, Debug)]
pub struct QueryError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// Additional context.
    pub context: ErrorContext,
    /// The source error (if any).
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl QueryError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Add context about the operation.
    pub fn with_context(mut self, operation: impl Into<String>) -> Self {
        self.context.operation = Some(operation.into());
        self
    }

    /// Add a suggestion for fixing the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context.suggestions.push(suggestion.into());
        self
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.context.model = Some(model.into());
        self
    }

    /// Set the column.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.context.field = Some(field.into());
        self
    }

    /// Set the SQL statement.
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.context.sql = Some(sql.into());
        self
    }

    /// Set the source error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // ============== Constructor Functions ==============

    /// Create a not found error.
    pub fn not_found(model: impl Into<String>) -> Self {
        let model = model.into();
        Self::new(
            ErrorCode::RecordNotFound,
            format!("No {} record found matching the query", model),
        )
        .with_model(&model)
        .with_suggestion("Use find_by_id() to get None instead of an error")
    }

    /// Create an invalid filter error.
    pub fn invalid_filter(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidFilter, message)
    }

    /// Create an invalid select error (projection, join or ordering).
    pub fn invalid_select(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidSelect, message)
    }

    /// Create an invalid pagination error.
    pub fn invalid_pagination(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidPagination, message)
            .with_suggestion("Page size must be greater than zero")
    }

    /// Create an unknown column error.
    pub fn unknown_column(column: impl Into<String>) -> Self {
        let column = column.into();
        Self::new(ErrorCode::UnknownColumn, format!("Unknown column '{}'", column))
            .with_field(&column)
            .with_suggestion("Qualify the column with a table alias declared in FROM or JOIN")
    }

    /// Create a unique constraint violation error.
    pub fn unique_violation(model: impl Into<String>, field: impl Into<String>) -> Self {
        let model = model.into();
        let field = field.into();
        Self::new(
            ErrorCode::UniqueConstraint,
            format!("Unique constraint violated on {}.{}", model, field),
        )
        .with_model(&model)
        .with_field(&field)
    }

    /// Create a foreign key violation error.
    pub fn foreign_key_violation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ForeignKeyConstraint, message)
            .with_suggestion("Save the referenced record before linking to it")
    }

    /// Create a not null violation error.
    pub fn not_null_violation(field: impl Into<String>) -> Self {
        let field = field.into();
        Self::new(
            ErrorCode::NotNullConstraint,
            format!("Null value in required column '{}'", field),
        )
        .with_field(&field)
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::ConnectionFailed, format!("Connection failed: {}", message))
            .with_suggestion("Check that the database path or URL is reachable")
    }

    /// Create a query timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::new(
            ErrorCode::QueryTimeout,
            format!("Query timed out after {}ms", duration_ms),
        )
        .with_suggestion("Narrow the search condition or retry later")
    }

    /// Create a deserialization error.
    pub fn deserialization(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(
            ErrorCode::DeserializationError,
            format!("Failed to deserialize result: {}", message),
        )
        .with_suggestion("Check that the model matches the database schema")
    }

    /// Create a general database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    // ============== Error Checks ==============

    /// Check if this is a not found error.
    pub fn is_not_found(&self) -> bool {
        self.code == ErrorCode::RecordNotFound
    }

    /// Check if the query could not be constructed against the store.
    pub fn is_query_construction(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::InvalidFilter
                | ErrorCode::InvalidSelect
                | ErrorCode::InvalidPagination
                | ErrorCode::UnknownColumn
        )
    }

    /// Check if this error originated in the backing record store.
    pub fn is_store_error(&self) -> bool {
        !self.is_not_found() && !self.is_query_construction()
    }

    /// Check if this is a constraint violation.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::UniqueConstraint
                | ErrorCode::ForeignKeyConstraint
                | ErrorCode::NotNullConstraint
        )
    }

    /// Check if this is a timeout error.
    pub fn is_timeout(&self) -> bool {
        self.code == ErrorCode::QueryTimeout
    }

    /// Display the full error with context and suggestions.
    pub fn display_full(&self) -> String {
        let mut output = format!("Error [{}]: {}\n", self.code.code(), self.message);

        if let Some(ref op) = self.context.operation {
            output.push_str(&format!("  → While: {}\n", op));
        }
        if let Some(ref model) = self.context.model {
            output.push_str(&format!("  → Model: {}\n", model));
        }
        if let Some(ref field) = self.context.field {
            output.push_str(&format!("  → Field: {}\n", field));
        }
        if let Some(ref sql) = self.context.sql {
            output.push_str(&format!("  → SQL: {}\n", sql));
        }

        if !self.context.suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for (i, suggestion) in self.context.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        output
    }
}
