//! # Issuance Defaults
//!
//! Issuer configuration and the pure "resolve defaults" step that runs
//! before validation.
//!
//! ## Default Resolution
//! ```text
//! candidate ──► 1. authorship unset?  stamp (actor, now)
//!           ──► 2. starts_at unset?   = authorship.created_at
//!           ──► 3. expiry interval configured and expires_at unset?
//!                                     = starts_at + interval
//!           ──► 4. code               = normalize_code(code)
//!           ──► resolved voucher (validation sees only this)
//! ```

use chrono::{DateTime, Duration, Utc};

use crate::types::{Authorship, Voucher};

// =============================================================================
// Issuer Policy
// =============================================================================

/// Per-issuer configuration. Built once, read on every issuance.
///
/// ## Example
/// ```rust
/// use chrono::Duration;
/// use facevalue_core::IssuerPolicy;
///
/// let policy = IssuerPolicy::default()
///     .with_id_length(Some(8))
///     .with_expiry_interval(Some(Duration::days(365)));
/// assert_eq!(policy.id_length, Some(8));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IssuerPolicy {
    /// Every issued code must have exactly this many characters.
    pub id_length: Option<usize>,

    /// Added to `starts_at` when the candidate has no `expires_at`.
    pub expiry_interval: Option<Duration>,
}

impl IssuerPolicy {
    pub fn with_id_length(mut self, id_length: Option<usize>) -> Self {
        self.id_length = id_length;
        self
    }

    /// `None` turns auto-expiry off, whatever was set before.
    pub fn with_expiry_interval(mut self, interval: Option<Duration>) -> Self {
        self.expiry_interval = interval;
        self
    }
}

// =============================================================================
// Default Resolution
// =============================================================================

/// Fills every defaultable field of `candidate`.
///
/// Fields the caller already set are left alone, including an existing
/// authorship stamp.
pub fn resolve_defaults(
    mut candidate: Voucher,
    actor: &str,
    now: DateTime<Utc>,
    policy: &IssuerPolicy,
) -> Voucher {
    let created_at = match &candidate.authorship {
        Some(authorship) => authorship.created_at(),
        None => {
            candidate.authorship = Some(Authorship::new(actor, now));
            now
        }
    };

    let starts_at = *candidate.starts_at.get_or_insert(created_at);

    if candidate.expires_at.is_none() {
        candidate.expires_at = policy.expiry_interval.map(|interval| starts_at + interval);
    }

    candidate.code = normalize_code(&candidate.code);
    candidate
}

/// The stored form of a voucher code: Unicode uppercase, untrimmed.
///
/// Lookups fold their argument the same way, so matching does not depend on
/// SQLite's ASCII-only `NOCASE`.
pub fn normalize_code(code: &str) -> String {
    code.to_uppercase()
}

// =============================================================================
// Unit Tests
// =============================================================================
