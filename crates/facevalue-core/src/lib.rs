//! # facevalue-core: Pure Voucher Logic
//!
//! Everything about a face-value voucher that can be decided without
//! touching storage: the entity and its balance math, issuance defaults,
//! and the validation rules that guard issuance.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               ★ facevalue-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────────────┐ │   │
//! │  │   │  types   │ │  money   │ │ issuance │ │    validation    │ │   │
//! │  │   │ Voucher  │ │  Money   │ │  Policy  │ │  rules 1-4, 6-7  │ │   │
//! │  │   │  Usage   │ │          │ │ defaults │ │                  │ │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────────────┘ │   │
//! │  │   ┌──────────┐ ┌──────────┐                                    │   │
//! │  │   │  clock   │ │  events  │   NO I/O • NO DATABASE             │   │
//! │  │   └──────────┘ └──────────┘                                    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          facevalue-db (VoucherIssuer, repositories)             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use facevalue_core::issuance::resolve_defaults;
//! use facevalue_core::validation::{validate_candidate, validate_fresh};
//! use facevalue_core::{IssuerPolicy, Money, Voucher};
//!
//! let now = Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap();
//! let policy = IssuerPolicy::default();
//!
//! let candidate = Voucher::new("gift10", "GBP", Money::from_major_minor(10, 0));
//! let voucher = resolve_defaults(candidate, "clerk-1", now, &policy);
//!
//! validate_candidate(&voucher, &policy).unwrap();
//! validate_fresh(&voucher).unwrap();
//! assert_eq!(voucher.code, "GIFT10");
//! assert_eq!(voucher.starts_at, Some(now));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod clock;
pub mod error;
pub mod events;
pub mod issuance;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{ValidationError, ValidationResult};
pub use events::{NoOpListener, TracingListener, VoucherEvent, VoucherEventListener, VOUCHER_CREATED};
pub use issuance::{normalize_code, IssuerPolicy};
pub use money::Money;
pub use types::*;
