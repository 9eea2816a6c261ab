//! # Domain Types
//!
//! Core domain types for face-value vouchers.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Voucher      │   │  VoucherUsage   │   │   CatalogItem   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  code (unique)  │──►│  id (UUID)      │   │  id (UUID)      │       │
//! │  │  currency       │   │  amount         │   │  sku            │       │
//! │  │  amount         │   │  recorded_at    │   │  price          │       │
//! │  │  starts/expires │   └─────────────────┘   └────────▲────────┘       │
//! │  │  used_at        │                                  │                │
//! │  │  purchased_as ──┼──────────────────────────────────┘                │
//! │  │  authorship     │                                                    │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Balance
//! `balance = amount - Σ usage.amount`. The ledger is append-only and its
//! order carries no meaning for the arithmetic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Authorship
// =============================================================================

/// Who created an entity, and when.
///
/// Fields are private: once stamped, authorship is never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorship {
    created_by: String,
    created_at: DateTime<Utc>,
}

impl Authorship {
    pub fn new(created_by: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Authorship {
            created_by: created_by.into(),
            created_at,
        }
    }

    #[inline]
    pub fn created_by(&self) -> &str {
        &self.created_by
    }

    #[inline]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

// =============================================================================
// Voucher Usage
// =============================================================================

/// One consumption record against a voucher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoucherUsage {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Amount consumed by this usage.
    pub amount: Money,

    /// When the usage was recorded.
    pub recorded_at: DateTime<Utc>,

    /// External reference (order number, till receipt, ...).
    pub reference: Option<String>,
}

// =============================================================================
// Voucher
// =============================================================================

/// A face-value credit identified by a unique code.
///
/// A `Voucher` starts life as a caller-built candidate. After issuance
/// `starts_at` and `authorship` are always populated and `code` is
/// uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voucher {
    /// Business identifier. Case-insensitive; stored uppercase.
    pub code: String,

    /// Currency the amount is denominated in (e.g. "GBP").
    pub currency: String,

    /// Face value.
    pub amount: Money,

    /// Usable from. Defaults to the creation time at issuance.
    pub starts_at: Option<DateTime<Utc>>,

    /// Not usable after.
    pub expires_at: Option<DateTime<Utc>>,

    /// Set once the voucher is closed.
    pub used_at: Option<DateTime<Utc>>,

    /// Catalog item that was sold to produce this voucher.
    pub purchased_as_item: Option<String>,

    /// Creation metadata.
    pub authorship: Option<Authorship>,

    /// Consumption ledger, in insertion order.
    pub usage: Vec<VoucherUsage>,
}

impl Voucher {
    /// Creates a candidate voucher with no dates and an empty ledger.
    pub fn new(code: impl Into<String>, currency: impl Into<String>, amount: Money) -> Self {
        Voucher {
            code: code.into(),
            currency: currency.into(),
            amount,
            starts_at: None,
            expires_at: None,
            used_at: None,
            purchased_as_item: None,
            authorship: None,
            usage: Vec::new(),
        }
    }

    pub fn starting_at(mut self, at: DateTime<Utc>) -> Self {
        self.starts_at = Some(at);
        self
    }

    pub fn expiring_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }

    pub fn marked_used_at(mut self, at: DateTime<Utc>) -> Self {
        self.used_at = Some(at);
        self
    }

    pub fn purchased_as(mut self, item_id: impl Into<String>) -> Self {
        self.purchased_as_item = Some(item_id.into());
        self
    }

    pub fn with_authorship(mut self, authorship: Authorship) -> Self {
        self.authorship = Some(authorship);
        self
    }

    pub fn with_usage(mut self, usage: VoucherUsage) -> Self {
        self.usage.push(usage);
        self
    }

    /// Sum of every ledger entry. Zero for an empty ledger.
    pub fn amount_used(&self) -> Money {
        self.usage.iter().map(|u| u.amount).sum()
    }

    /// Face value minus what has been used. May be zero or negative.
    ///
    /// ## Example
    /// ```rust
    /// use facevalue_core::{Money, Voucher};
    ///
    /// let voucher = Voucher::new("GIFT10", "GBP", Money::from_major_minor(10, 0));
    /// assert_eq!(voucher.balance(), Money::from_major_minor(10, 0));
    /// ```
    pub fn balance(&self) -> Money {
        self.amount - self.amount_used()
    }

    /// When the voucher was created, if it has been stamped.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.authorship.as_ref().map(Authorship::created_at)
    }

    /// Whether the voucher is open and inside its activation window at `at`.
    ///
    /// `starts_at` is inclusive, `expires_at` exclusive.
    pub fn is_redeemable_at(&self, at: DateTime<Utc>) -> bool {
        if self.used_at.is_some() {
            return false;
        }
        if self.starts_at.is_some_and(|start| at < start) {
            return false;
        }
        if self.expires_at.is_some_and(|end| at >= end) {
            return false;
        }
        true
    }
}

// =============================================================================
// Catalog Item
// =============================================================================

/// A sellable item a voucher can be purchased as (e.g. "£25 gift card").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Display name.
    pub name: String,

    /// Sale price.
    pub price: Money,

    /// Currency of the sale price.
    pub currency: String,

    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
