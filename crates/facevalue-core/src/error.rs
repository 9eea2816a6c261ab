//! # Error Types
//!
//! Domain-specific error types for facevalue-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  facevalue-core errors (this file)                                     │
//! │  └── ValidationError  - Why a voucher may not be issued                │
//! │                                                                         │
//! │  facevalue-db errors (separate crate)                                  │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── IssueError       - Rejected | Conflict | Db                       │
//! │                                                                         │
//! │  Flow: ValidationError → IssueError::Rejected → caller                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (code, lengths, timestamps)
//! 3. One variant per issuance rule, so callers can match on the rule

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Validation Error
// =============================================================================

/// Reasons a candidate voucher is refused at issuance.
///
/// The issuer checks the rules in declaration order and reports the first
/// one that fails. None of these are transient; the caller must fix the
/// input and retry the whole call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Rule 1: the code is empty or whitespace.
    #[error("voucher code is required")]
    MissingCode,

    /// Rule 2: the face value is zero or negative.
    #[error("voucher amount must be positive, got {amount}")]
    NonPositiveAmount { amount: Money },

    /// Rule 3: the issuer requires codes of a fixed length.
    #[error("voucher code '{code}' must be exactly {expected} characters, got {actual}")]
    CodeLengthMismatch {
        code: String,
        expected: usize,
        actual: usize,
    },

    /// Rule 4: no currency given.
    #[error("voucher currency is required")]
    MissingCurrency,

    /// Rule 5: a persisted voucher already holds this code.
    #[error("voucher code '{code}' already exists")]
    DuplicateCode { code: String },

    /// Rule 6: the candidate is already marked used.
    #[error("voucher '{code}' is already marked used at {used_at}")]
    AlreadyUsed {
        code: String,
        used_at: DateTime<Utc>,
    },

    /// Rule 7: the activation window is inverted.
    #[error("voucher '{code}' starts at {starts_at}, after it expires at {expires_at}")]
    StartsAfterExpiry {
        code: String,
        starts_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Unit Tests
// =============================================================================
