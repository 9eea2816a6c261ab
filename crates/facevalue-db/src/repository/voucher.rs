//! # Voucher Repository
//!
//! Storage for vouchers and their usage ledger.
//!
//! ## Tables
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  vouchers (code PK, NOCASE)            voucher_usage (append-only)     │
//! │  ───────────────────────────           ───────────────────────────      │
//! │  GIFT10 | GBP | 1000 | ...   ◄──────── u-1 | GIFT10 | 250 | ...        │
//! │                              ◄──────── u-2 | GIFT10 | 125 | ...        │
//! │                                                                         │
//! │  Loading a voucher reads both; usage comes back in rowid order.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The connection-level functions (`find_by_code`, `code_exists`, `insert`)
//! take a bare `SqliteConnection` so the issuer can run them on a pooled
//! connection or inside a caller's transaction alike.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use facevalue_core::{normalize_code, Authorship, Money, Voucher, VoucherUsage};

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, FromRow)]
struct VoucherRow {
    code: String,
    currency: String,
    amount_cents: i64,
    starts_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    used_at: Option<DateTime<Utc>>,
    purchased_as_item: Option<String>,
    created_at: DateTime<Utc>,
    created_by: String,
}

impl VoucherRow {
    fn into_voucher(self, usage: Vec<VoucherUsage>) -> Voucher {
        Voucher {
            code: self.code,
            currency: self.currency,
            amount: Money::from_cents(self.amount_cents),
            starts_at: Some(self.starts_at),
            expires_at: self.expires_at,
            used_at: self.used_at,
            purchased_as_item: self.purchased_as_item,
            authorship: Some(Authorship::new(self.created_by, self.created_at)),
            usage,
        }
    }
}

#[derive(Debug, FromRow)]
struct UsageRow {
    id: String,
    amount_cents: i64,
    reference: Option<String>,
    recorded_at: DateTime<Utc>,
}

impl From<UsageRow> for VoucherUsage {
    fn from(row: UsageRow) -> Self {
        VoucherUsage {
            id: row.id,
            amount: Money::from_cents(row.amount_cents),
            recorded_at: row.recorded_at,
            reference: row.reference,
        }
    }
}

// =============================================================================
// Connection-Level Operations
// =============================================================================

/// Loads a voucher and its full ledger. The lookup is case-insensitive.
///
/// `code` is normalized first: `NOCASE` only folds ASCII, so a stored
/// `"Ä1"` is found from `"ä1"` only through the normalized argument.
pub(crate) async fn find_by_code(
    conn: &mut SqliteConnection,
    code: &str,
) -> DbResult<Option<Voucher>> {
    let row = sqlx::query_as::<_, VoucherRow>(
        r#"
        SELECT
            code,
            currency,
            amount_cents,
            starts_at,
            expires_at,
            used_at,
            purchased_as_item,
            created_at,
            created_by
        FROM vouchers
        WHERE code = ?1
        "#,
    )
    .bind(normalize_code(code))
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let usage = load_usage(conn, &row.code).await?;
    Ok(Some(row.into_voucher(usage)))
}

/// Whether any voucher holds `code`, in any case.
pub(crate) async fn code_exists(conn: &mut SqliteConnection, code: &str) -> DbResult<bool> {
    let found: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM vouchers WHERE code = ?1)")
        .bind(normalize_code(code))
        .fetch_one(&mut *conn)
        .await?;

    Ok(found != 0)
}

/// Inserts a resolved voucher and any ledger entries it carries.
///
/// ## Returns
/// * `Err(DbError::UniqueViolation)` - the code is already stored (any case)
/// * `Err(DbError::ForeignKeyViolation)` - `purchased_as_item` is unknown
pub(crate) async fn insert(conn: &mut SqliteConnection, voucher: &Voucher) -> DbResult<()> {
    let (Some(starts_at), Some(authorship)) = (voucher.starts_at, voucher.authorship.as_ref())
    else {
        return Err(DbError::Internal(format!(
            "voucher {} must have starts_at and authorship before insert",
            voucher.code
        )));
    };

    debug!(code = %voucher.code, amount = %voucher.amount, "Inserting voucher");

    sqlx::query(
        r#"
        INSERT INTO vouchers (
            code, currency, amount_cents,
            starts_at, expires_at, used_at,
            purchased_as_item, created_at, created_by
        ) VALUES (
            ?1, ?2, ?3,
            ?4, ?5, ?6,
            ?7, ?8, ?9
        )
        "#,
    )
    .bind(&voucher.code)
    .bind(&voucher.currency)
    .bind(voucher.amount.cents())
    .bind(starts_at)
    .bind(voucher.expires_at)
    .bind(voucher.used_at)
    .bind(&voucher.purchased_as_item)
    .bind(authorship.created_at())
    .bind(authorship.created_by())
    .execute(&mut *conn)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
            field,
            value: voucher.code.clone(),
        },
        other => other,
    })?;

    for usage in &voucher.usage {
        insert_usage(conn, &voucher.code, usage).await?;
    }

    Ok(())
}

async fn insert_usage(
    conn: &mut SqliteConnection,
    code: &str,
    usage: &VoucherUsage,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO voucher_usage (id, voucher_code, amount_cents, reference, recorded_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(&usage.id)
    .bind(code)
    .bind(usage.amount.cents())
    .bind(&usage.reference)
    .bind(usage.recorded_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn load_usage(conn: &mut SqliteConnection, code: &str) -> DbResult<Vec<VoucherUsage>> {
    let rows = sqlx::query_as::<_, UsageRow>(
        r#"
        SELECT id, amount_cents, reference, recorded_at
        FROM voucher_usage
        WHERE voucher_code = ?1
        ORDER BY rowid
        "#,
    )
    .bind(code)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(VoucherUsage::from).collect())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for voucher database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.vouchers();
///
/// let voucher = repo.get_by_code("gift10").await?;   // finds "GIFT10"
/// repo.record_usage("GIFT10", Money::from_cents(250), Some("till-3"), clock.now()).await?;
/// ```
#[derive(Debug, Clone)]
pub struct VoucherRepository {
    pool: SqlitePool,
}

impl VoucherRepository {
    /// Creates a new VoucherRepository.
    pub fn new(pool: SqlitePool) -> Self {
        VoucherRepository { pool }
    }

    /// Gets a voucher with its ledger by code (case-insensitive).
    ///
    /// ## Returns
    /// * `Ok(Some(Voucher))` - Voucher found
    /// * `Ok(None)` - No voucher with that code
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Voucher>> {
        let mut conn = self.pool.acquire().await?;
        find_by_code(&mut conn, code).await
    }

    /// Whether a voucher with this code exists (case-insensitive).
    pub async fn exists(&self, code: &str) -> DbResult<bool> {
        let mut conn = self.pool.acquire().await?;
        code_exists(&mut conn, code).await
    }

    /// Appends a usage entry to a voucher's ledger.
    ///
    /// Records whatever amount it is given; whether a usage may exceed the
    /// remaining balance is decided by the caller. `recorded_at` comes from
    /// the caller's clock.
    ///
    /// ## Returns
    /// * `Err(DbError::ForeignKeyViolation)` - no voucher with that code
    pub async fn record_usage(
        &self,
        code: &str,
        amount: Money,
        reference: Option<&str>,
        recorded_at: DateTime<Utc>,
    ) -> DbResult<VoucherUsage> {
        debug!(code = %code, amount = %amount, "Recording voucher usage");

        let usage = VoucherUsage {
            id: generate_usage_id(),
            amount,
            recorded_at,
            reference: reference.map(str::to_string),
        };

        let mut conn = self.pool.acquire().await?;
        insert_usage(&mut conn, &normalize_code(code), &usage).await?;

        Ok(usage)
    }

    /// Gets a voucher's ledger in insertion order (case-insensitive code).
    pub async fn list_usage(&self, code: &str) -> DbResult<Vec<VoucherUsage>> {
        let mut conn = self.pool.acquire().await?;
        load_usage(&mut conn, &normalize_code(code)).await
    }

    /// Counts stored vouchers (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vouchers")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Generates a new usage entry ID.
pub fn generate_usage_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::{Duration, TimeZone};

    fn stamped(code: &str, cents: i64) -> Voucher {
        let at = Utc.with_ymd_and_hms(2026, 4, 1, 10, 0, 0).unwrap();
        Voucher::new(code, "GBP", Money::from_cents(cents))
            .starting_at(at)
            .with_authorship(Authorship::new("tester", at))
    }

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_find_round_trip() {
        let db = db().await;
        let at = Utc.with_ymd_and_hms(2026, 4, 1, 10, 0, 0).unwrap();
        let voucher = stamped("SPRING", 2500).expiring_at(at + Duration::days(90));

        let mut conn = db.pool().acquire().await.unwrap();
        insert(&mut conn, &voucher).await.unwrap();
        let loaded = find_by_code(&mut conn, "SPRING").await.unwrap().unwrap();

        assert_eq!(loaded, voucher);
    }

    #[tokio::test]
    async fn test_lookup_is_case_insensitive() {
        let db = db().await;
        let mut conn = db.pool().acquire().await.unwrap();
        insert(&mut conn, &stamped("ABC123", 100)).await.unwrap();

        assert!(code_exists(&mut conn, "abc123").await.unwrap());
        let loaded = find_by_code(&mut conn, "aBc123").await.unwrap().unwrap();
        assert_eq!(loaded.code, "ABC123");
        assert!(!code_exists(&mut conn, "ABC124").await.unwrap());
    }

    #[tokio::test]
    async fn test_unique_key_ignores_case() {
        let db = db().await;
        let mut conn = db.pool().acquire().await.unwrap();
        insert(&mut conn, &stamped("ABC123", 100)).await.unwrap();

        let err = insert(&mut conn, &stamped("abc123", 100)).await.unwrap_err();
        match err {
            DbError::UniqueViolation { field, value } => {
                assert_eq!(field, "vouchers.code");
                assert_eq!(value, "abc123");
            }
            other => panic!("expected unique violation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_insert_requires_resolved_voucher() {
        let db = db().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let bare = Voucher::new("BARE", "GBP", Money::from_cents(100));

        assert!(matches!(
            insert(&mut conn, &bare).await,
            Err(DbError::Internal(_))
        ));
    }

    #[tokio::test]
    async fn test_usage_ledger_keeps_order_and_drives_balance() {
        let db = db().await;
        {
            let mut conn = db.pool().acquire().await.unwrap();
            insert(&mut conn, &stamped("LEDGER", 1000)).await.unwrap();
        }

        let at = Utc.with_ymd_and_hms(2026, 5, 2, 14, 15, 0).unwrap();
        let repo = db.vouchers();
        let first = repo
            .record_usage("ledger", Money::from_cents(300), Some("till-1"), at)
            .await
            .unwrap();
        let second = repo
            .record_usage("LEDGER", Money::from_cents(200), None, at + Duration::minutes(5))
            .await
            .unwrap();

        let usage = repo.list_usage("LEDGER").await.unwrap();
        assert_eq!(usage.len(), 2);
        assert_eq!(usage[0].id, first.id);
        assert_eq!(usage[0].reference.as_deref(), Some("till-1"));
        assert_eq!(usage[0].recorded_at, at);
        assert_eq!(usage[1].id, second.id);
        assert_eq!(usage[1].recorded_at, at + Duration::minutes(5));

        assert_eq!(repo.list_usage("ledger").await.unwrap(), usage);

        let voucher = repo.get_by_code("LEDGER").await.unwrap().unwrap();
        assert_eq!(voucher.usage, usage);
        assert_eq!(voucher.amount_used(), Money::from_cents(500));
        assert_eq!(voucher.balance(), Money::from_cents(500));
    }

    #[tokio::test]
    async fn test_lookups_fold_non_ascii_codes() {
        let db = db().await;
        {
            let mut conn = db.pool().acquire().await.unwrap();
            insert(&mut conn, &stamped("Ä1", 100)).await.unwrap();
        }

        let repo = db.vouchers();
        assert!(repo.exists("ä1").await.unwrap());
        assert_eq!(repo.get_by_code("ä1").await.unwrap().unwrap().code, "Ä1");

        let at = Utc.with_ymd_and_hms(2026, 5, 2, 9, 0, 0).unwrap();
        repo.record_usage("ä1", Money::from_cents(40), None, at)
            .await
            .unwrap();
        assert_eq!(repo.list_usage("ä1").await.unwrap().len(), 1);
        assert_eq!(repo.list_usage("Ä1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_usage_against_unknown_voucher_is_rejected() {
        let db = db().await;

        let err = db
            .vouchers()
            .record_usage("NOPE", Money::from_cents(1), None, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn test_count_and_exists() {
        let db = db().await;
        let repo = db.vouchers();
        assert_eq!(repo.count().await.unwrap(), 0);
        assert!(!repo.exists("ONE").await.unwrap());

        {
            let mut conn = db.pool().acquire().await.unwrap();
            insert(&mut conn, &stamped("ONE", 1)).await.unwrap();
        }

        assert_eq!(repo.count().await.unwrap(), 1);
        assert!(repo.exists("one").await.unwrap());
        assert!(repo.get_by_code("TWO").await.unwrap().is_none());
    }
}
