//! # Database Error Types
//!
//! Error types for storage operations and for the issuance flow.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  IssueError                                                            │
//! │  ├── Rejected(ValidationError)  caller input broke an issuance rule    │
//! │  ├── Conflict { code }          unique key lost a race at insert time  │
//! │  └── Db(DbError)                anything else storage reported         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use facevalue_core::ValidationError;
use thiserror::Error;

/// Database operation errors.
///
/// These errors wrap sqlx errors and provide additional context
/// for debugging and user feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Inserting a voucher code that already exists (any case)
    /// - Duplicate catalog SKU
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - `purchased_as_item` names an item that doesn't exist
    /// - Recording usage against an unknown voucher code
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Another connection held the write lock past `busy_timeout`
    /// (SQLITE_BUSY and its extended codes).
    #[error("Database busy: {0}")]
    Busy(String),

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type,
///                               SQLITE_BUSY codes → DbError::Busy
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite reports constraints as:
                // "UNIQUE constraint failed: <table>.<column>"
                // "FOREIGN KEY constraint failed"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if is_busy(db_err.code().as_deref(), msg) {
                    DbError::Busy(msg.to_string())
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

/// SQLITE_BUSY (5) and its extended forms: BUSY_RECOVERY (261),
/// BUSY_SNAPSHOT (517), BUSY_TIMEOUT (773).
fn is_busy(code: Option<&str>, message: &str) -> bool {
    matches!(code, Some("5" | "261" | "517" | "773")) || message.contains("database is locked")
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Issue Error
// =============================================================================

/// Why `VoucherIssuer::create` failed.
#[derive(Debug, Error)]
pub enum IssueError {
    /// The candidate broke an issuance rule. Nothing was written.
    #[error("Voucher rejected: {0}")]
    Rejected(#[from] ValidationError),

    /// Storage refused the insert because the code is already taken.
    ///
    /// ## When This Occurs
    /// Two issuances of the same code both pass the lookup and race to
    /// insert; the loser sees this instead of `DuplicateCode`.
    #[error("Voucher code '{code}' was taken concurrently")]
    Conflict { code: String },

    /// Any other storage failure.
    #[error(transparent)]
    Db(#[from] DbError),
}

/// Result type for issuance.
pub type IssueResult<T> = Result<T, IssueError>;

// =============================================================================
// Unit Tests
// =============================================================================
