//! # Repository Module
//!
//! Database repository implementations for facevalue.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Caller                                                                │
//! │       │                                                                 │
//! │       │  db.vouchers().get_by_code("gift10")                           │
//! │       ▼                                                                 │
//! │  VoucherRepository                    ItemRepository                   │
//! │  ├── get_by_code / exists             ├── get_by_id / get_by_sku       │
//! │  ├── record_usage / list_usage        └── insert                       │
//! │  └── count                                                             │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Voucher inserts are not on the repository: they go through
//! [`VoucherIssuer`](crate::issuer::VoucherIssuer), which validates first.
//!
//! ## Available Repositories
//!
//! - [`VoucherRepository`] - Voucher lookup and usage ledger
//! - [`ItemRepository`] - Catalog items vouchers are sold as

pub mod item;
pub mod voucher;

pub use item::{generate_item_id, ItemRepository};
pub use voucher::{generate_usage_id, VoucherRepository};
