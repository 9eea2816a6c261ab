//! # facevalue-db: Storage Layer and Voucher Issuer
//!
//! SQLite storage for vouchers, their usage ledger and catalog items, plus
//! the [`VoucherIssuer`] that validates and persists new vouchers.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Caller (till, back office, seed)                                      │
//! │       │                                                                 │
//! │       │  issuer.create(candidate, actor)                               │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   facevalue-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │ VoucherIssuer │───►│  Repositories │───►│   Database   │  │   │
//! │  │   │  (issuer.rs)  │    │ voucher, item │    │  (pool.rs)   │  │   │
//! │  │   └───────┬───────┘    └───────────────┘    └──────┬───────┘  │   │
//! │  │           │ rules, defaults                        │          │   │
//! │  │           ▼                                        ▼          │   │
//! │  │     facevalue-core                          Migrations        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (FACEVALUE_DB_PATH)                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Storage and issuance error types
//! - [`repository`] - Voucher and catalog item repositories
//! - [`issuer`] - Validation plus persistence of new vouchers
//! - [`config`] - Environment configuration
//!
//! ## Usage
//!
//! ```rust,ignore
//! use facevalue_db::{Database, DbConfig, VoucherIssuer};
//!
//! let db = Database::new(DbConfig::new("path/to/facevalue.db")).await?;
//! let issuer = VoucherIssuer::new(db.clone());
//!
//! let voucher = issuer
//!     .create(Voucher::new("gift10", "GBP", Money::from_cents(1000)), "clerk-1")
//!     .await?;
//! assert_eq!(voucher.code, "GIFT10");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod issuer;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, IssuerConfig};
pub use error::{DbError, DbResult, IssueError, IssueResult};
pub use issuer::VoucherIssuer;
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::item::ItemRepository;
pub use repository::voucher::VoucherRepository;
