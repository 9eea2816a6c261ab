//! # Validation Module
//!
//! The rules a candidate voucher must satisfy before it is persisted.
//!
//! ## Rule Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Issuance Rules (first failure wins)                │
//! │                                                                         │
//! │  validate_candidate()        ← pure, no storage needed                 │
//! │  ├── 1. code not empty                                                 │
//! │  ├── 2. amount > 0                                                     │
//! │  ├── 3. code length == id_length (if configured)                       │
//! │  └── 4. currency not empty                                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  validate_code_available()   ← issuer supplies the lookup result       │
//! │  └── 5. no persisted voucher with this code                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  validate_fresh()            ← pure                                    │
//! │  ├── 6. used_at unset                                                  │
//! │  └── 7. starts_at <= expires_at                                        │
//! │                                                                         │
//! │  The storage layer's unique key on code is the final arbiter for 5.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use facevalue_core::validation::validate_candidate;
//! use facevalue_core::{IssuerPolicy, Money, Voucher};
//!
//! let policy = IssuerPolicy::default().with_id_length(Some(6));
//! let voucher = Voucher::new("ABC", "GBP", Money::from_cents(500));
//! assert!(validate_candidate(&voucher, &policy).is_err());
//! ```

use chrono::{DateTime, Utc};

use crate::error::{ValidationError, ValidationResult};
use crate::issuance::IssuerPolicy;
use crate::money::Money;
use crate::types::Voucher;

// =============================================================================
// Individual Rules
// =============================================================================

/// Rule 1. Whitespace-only codes count as empty.
pub fn validate_code(code: &str) -> ValidationResult<()> {
    if code.trim().is_empty() {
        return Err(ValidationError::MissingCode);
    }
    Ok(())
}

/// Rule 2.
///
/// ## Example
/// ```rust
/// use facevalue_core::validation::validate_amount;
/// use facevalue_core::Money;
///
/// assert!(validate_amount(Money::from_cents(1)).is_ok());
/// assert!(validate_amount(Money::zero()).is_err());
/// assert!(validate_amount(Money::from_cents(-100)).is_err());
/// ```
pub fn validate_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::NonPositiveAmount { amount });
    }
    Ok(())
}

/// Rule 3. Length is counted in characters, not bytes.
pub fn validate_code_length(code: &str, id_length: Option<usize>) -> ValidationResult<()> {
    let Some(expected) = id_length else {
        return Ok(());
    };

    let actual = code.chars().count();
    if actual != expected {
        return Err(ValidationError::CodeLengthMismatch {
            code: code.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

/// Rule 4.
pub fn validate_currency(currency: &str) -> ValidationResult<()> {
    if currency.trim().is_empty() {
        return Err(ValidationError::MissingCurrency);
    }
    Ok(())
}

/// Rule 5. `taken` is whether storage already holds `code`.
pub fn validate_code_available(code: &str, taken: bool) -> ValidationResult<()> {
    if taken {
        return Err(ValidationError::DuplicateCode {
            code: code.to_string(),
        });
    }
    Ok(())
}

/// Rule 6.
pub fn validate_unused(code: &str, used_at: Option<DateTime<Utc>>) -> ValidationResult<()> {
    if let Some(used_at) = used_at {
        return Err(ValidationError::AlreadyUsed {
            code: code.to_string(),
            used_at,
        });
    }
    Ok(())
}

/// Rule 7. Equal start and expiry is allowed.
pub fn validate_window(
    code: &str,
    starts_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
) -> ValidationResult<()> {
    if let (Some(starts_at), Some(expires_at)) = (starts_at, expires_at) {
        if expires_at < starts_at {
            return Err(ValidationError::StartsAfterExpiry {
                code: code.to_string(),
                starts_at,
                expires_at,
            });
        }
    }
    Ok(())
}

// =============================================================================
// Rule Groups
// =============================================================================

/// Rules 1-4, the checks that need nothing but the candidate and policy.
pub fn validate_candidate(voucher: &Voucher, policy: &IssuerPolicy) -> ValidationResult<()> {
    validate_code(&voucher.code)?;
    validate_amount(voucher.amount)?;
    validate_code_length(&voucher.code, policy.id_length)?;
    validate_currency(&voucher.currency)?;
    Ok(())
}

/// Rules 6-7, run after the uniqueness lookup.
pub fn validate_fresh(voucher: &Voucher) -> ValidationResult<()> {
    validate_unused(&voucher.code, voucher.used_at)?;
    validate_window(&voucher.code, voucher.starts_at, voucher.expires_at)?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
