//! # Voucher Issuer
//!
//! Validates candidate vouchers and persists the ones that pass.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          create(candidate, actor)                       │
//! │                                                                         │
//! │  resolve_defaults ── authorship, startsAt, expiresAt, UPPERCASE code   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  rules 1-4 (pure) ──────────────────────────────► Rejected             │
//! │       │                                                                 │
//! │       ▼          ┌──────────── one transaction ────────────┐           │
//! │  rule 5 lookup ──┤ taken? ────────────────────► Rejected   │           │
//! │  rules 6-7       │ used / inverted window ────► Rejected   │           │
//! │  INSERT          │ unique key lost race ──────► Conflict   │           │
//! │                  └─────────────────────────────────────────┘           │
//! │       │                                                                 │
//! │       ├── direct:   COMMIT ─► publish ─► reload ─► Voucher             │
//! │       └── deferred: publish ─► in-memory Voucher (caller commits)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Direct mode opens its transaction with `BEGIN IMMEDIATE`, so concurrent
//! issuances queue on the write lock and the loser's lookup already sees the
//! winner's row. The `vouchers.code` primary key still decides uniqueness for
//! deferred mode, where the caller chose how the transaction began.

use std::sync::Arc;

use sqlx::{Sqlite, SqliteConnection, Transaction};
use tracing::{debug, info};

use facevalue_core::issuance::resolve_defaults;
use facevalue_core::validation::{validate_candidate, validate_code_available, validate_fresh};
use facevalue_core::{
    Clock, IssuerPolicy, SystemClock, Voucher, VoucherEvent, VoucherEventListener,
};

use crate::error::{DbError, IssueError, IssueResult};
use crate::pool::Database;
use crate::repository::voucher as store;

/// Issues new vouchers.
///
/// Policy, clock and listeners are fixed at construction and only read
/// afterwards. Clones share the same database pool and listeners.
///
/// ## Usage
/// ```rust,ignore
/// let issuer = VoucherIssuer::new(db.clone())
///     .with_policy(IssuerPolicy::default().with_id_length(Some(6)))
///     .with_listener(Arc::new(TracingListener));
///
/// let voucher = issuer
///     .create(Voucher::new("gift10", "GBP", Money::from_cents(1000)), "clerk-1")
///     .await?;
/// ```
#[derive(Clone)]
pub struct VoucherIssuer {
    db: Database,
    policy: IssuerPolicy,
    clock: Arc<dyn Clock>,
    listeners: Vec<Arc<dyn VoucherEventListener>>,
}

impl std::fmt::Debug for VoucherIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoucherIssuer")
            .field("policy", &self.policy)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl VoucherIssuer {
    /// Creates an issuer with the default policy (no length rule, no expiry),
    /// the system clock and no listeners.
    pub fn new(db: Database) -> Self {
        VoucherIssuer {
            db,
            policy: IssuerPolicy::default(),
            clock: Arc::new(SystemClock),
            listeners: Vec::new(),
        }
    }

    pub fn with_policy(mut self, policy: IssuerPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replaces the time source used for authorship and date defaults.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Adds a listener for `voucher.created`.
    pub fn with_listener(mut self, listener: Arc<dyn VoucherEventListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn policy(&self) -> &IssuerPolicy {
        &self.policy
    }

    /// Validates and persists `candidate` in its own transaction.
    ///
    /// On success the voucher is committed, `voucher.created` is published
    /// and the stored record is read back and returned.
    ///
    /// ## Returns
    /// * `Err(IssueError::Rejected)` - an issuance rule failed, nothing written
    /// * `Err(IssueError::Conflict)` - the code was inserted concurrently, or
    ///   the write lock could not be had within `busy_timeout`
    /// * `Err(IssueError::Db)` - any other storage failure
    pub async fn create(&self, candidate: Voucher, actor: &str) -> IssueResult<Voucher> {
        let voucher = self.prepare(candidate, actor)?;

        let mut tx = self
            .db
            .begin_immediate()
            .await
            .map_err(|e| conflict_or_db(e, &voucher.code))?;
        self.check_and_insert(&mut *tx, &voucher).await?;
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(code = %voucher.code, amount = %voucher.amount, currency = %voucher.currency, "Voucher issued");
        self.publish(&voucher);

        let mut conn = self.db.pool().acquire().await.map_err(DbError::from)?;
        let stored = store::find_by_code(&mut conn, &voucher.code)
            .await?
            .ok_or_else(|| DbError::not_found("Voucher", voucher.code.as_str()))?;

        Ok(stored)
    }

    /// Validates and inserts `candidate` inside a caller-owned transaction.
    ///
    /// The record is not committed, so it is not read back: the resolved
    /// in-memory voucher is returned instead. `voucher.created` is still
    /// published exactly once, even if the caller later rolls back.
    ///
    /// Start `tx` with [`Database::begin_immediate`] to serialize it against
    /// other issuers.
    pub async fn create_in(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        candidate: Voucher,
        actor: &str,
    ) -> IssueResult<Voucher> {
        let voucher = self.prepare(candidate, actor)?;

        self.check_and_insert(&mut **tx, &voucher).await?;

        info!(code = %voucher.code, amount = %voucher.amount, currency = %voucher.currency, "Voucher issued (deferred commit)");
        self.publish(&voucher);

        Ok(voucher)
    }

    /// Fills defaults and applies the rules that need no storage.
    fn prepare(&self, candidate: Voucher, actor: &str) -> IssueResult<Voucher> {
        let voucher = resolve_defaults(candidate, actor, self.clock.now(), &self.policy);

        validate_candidate(&voucher, &self.policy).inspect_err(|e| {
            debug!(code = %voucher.code, error = %e, "Voucher rejected");
        })?;

        Ok(voucher)
    }

    async fn check_and_insert(
        &self,
        conn: &mut SqliteConnection,
        voucher: &Voucher,
    ) -> IssueResult<()> {
        let taken = store::code_exists(&mut *conn, &voucher.code).await?;

        validate_code_available(&voucher.code, taken)
            .and_then(|()| validate_fresh(voucher))
            .inspect_err(|e| {
                debug!(code = %voucher.code, error = %e, "Voucher rejected");
            })?;

        store::insert(conn, voucher)
            .await
            .map_err(|e| conflict_or_db(e, &voucher.code))
    }

    fn publish(&self, voucher: &Voucher) {
        let event = VoucherEvent::Created {
            voucher: voucher.clone(),
        };
        for listener in &self.listeners {
            listener.publish(event.name(), &event);
        }
    }
}

/// Another issuance won the race: either it holds the write lock, or its
/// row already owns the voucher key.
fn conflict_or_db(err: DbError, code: &str) -> IssueError {
    match err {
        DbError::UniqueViolation { ref field, .. } if field == "vouchers.code" => {
            IssueError::Conflict {
                code: code.to_string(),
            }
        }
        DbError::Busy(_) => IssueError::Conflict {
            code: code.to_string(),
        },
        other => IssueError::Db(other),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::DbConfig;
    use crate::repository::generate_item_id;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use facevalue_core::{
        Authorship, CatalogItem, FixedClock, Money, ValidationError, VoucherUsage,
        VOUCHER_CREATED,
    };
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingListener {
        events: Mutex<Vec<(String, VoucherEvent)>>,
    }

    impl RecordingListener {
        fn events(&self) -> Vec<(String, VoucherEvent)> {
            self.events.lock().unwrap().clone()
        }
    }

    impl VoucherEventListener for RecordingListener {
        fn publish(&self, event_name: &str, event: &VoucherEvent) {
            self.events
                .lock()
                .unwrap()
                .push((event_name.to_string(), event.clone()));
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 0).unwrap()
    }

    async fn setup(policy: IssuerPolicy) -> (Database, VoucherIssuer, Arc<RecordingListener>) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let listener = Arc::new(RecordingListener::default());
        let issuer = VoucherIssuer::new(db.clone())
            .with_policy(policy)
            .with_clock(Arc::new(FixedClock::new(now())))
            .with_listener(listener.clone());
        (db, issuer, listener)
    }

    fn gift(code: &str) -> Voucher {
        Voucher::new(code, "GBP", Money::from_major_minor(10, 0))
    }

    fn rejection(result: IssueResult<Voucher>) -> ValidationError {
        match result {
            Err(IssueError::Rejected(e)) => e,
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_gift10_defaults() {
        let (db, issuer, listener) = setup(IssuerPolicy::default()).await;

        let voucher = issuer.create(gift("gift10"), "clerk-1").await.unwrap();

        assert_eq!(voucher.code, "GIFT10");
        assert_eq!(voucher.starts_at, Some(now()));
        assert_eq!(voucher.starts_at, voucher.created_at());
        assert_eq!(voucher.expires_at, None);
        assert_eq!(voucher.balance(), Money::from_major_minor(10, 0));

        let authorship = voucher.authorship.as_ref().unwrap();
        assert_eq!(authorship.created_by(), "clerk-1");
        assert_eq!(authorship.created_at(), now());

        assert_eq!(db.vouchers().count().await.unwrap(), 1);

        let events = listener.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, VOUCHER_CREATED);
        let VoucherEvent::Created { voucher: published } = &events[0].1;
        assert_eq!(published.code, "GIFT10");
    }

    #[tokio::test]
    async fn test_missing_code_is_rejected_before_persistence() {
        let (db, issuer, listener) = setup(IssuerPolicy::default()).await;

        let err = rejection(issuer.create(gift(""), "clerk-1").await);
        assert_eq!(err, ValidationError::MissingCode);

        let err = rejection(issuer.create(gift("   "), "clerk-1").await);
        assert_eq!(err, ValidationError::MissingCode);

        assert_eq!(db.vouchers().count().await.unwrap(), 0);
        assert!(listener.events().is_empty());
    }

    #[tokio::test]
    async fn test_non_positive_amount_is_rejected() {
        let (db, issuer, _) = setup(IssuerPolicy::default()).await;

        for cents in [0, -250] {
            let candidate = Voucher::new("VALID1", "GBP", Money::from_cents(cents));
            let err = rejection(issuer.create(candidate, "clerk-1").await);
            assert_eq!(
                err,
                ValidationError::NonPositiveAmount {
                    amount: Money::from_cents(cents)
                }
            );
        }

        assert_eq!(db.vouchers().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_id_length_policy() {
        let (_, issuer, _) = setup(IssuerPolicy::default().with_id_length(Some(6))).await;

        let err = rejection(issuer.create(gift("ABC"), "clerk-1").await);
        assert_eq!(
            err,
            ValidationError::CodeLengthMismatch {
                code: "ABC".to_string(),
                expected: 6,
                actual: 3,
            }
        );

        let voucher = issuer.create(gift("abcdef"), "clerk-1").await.unwrap();
        assert_eq!(voucher.code, "ABCDEF");
    }

    #[tokio::test]
    async fn test_missing_currency_is_rejected() {
        let (_, issuer, _) = setup(IssuerPolicy::default()).await;

        let candidate = Voucher::new("NOCUR", "", Money::from_cents(500));
        let err = rejection(issuer.create(candidate, "clerk-1").await);
        assert_eq!(err, ValidationError::MissingCurrency);
    }

    #[tokio::test]
    async fn test_codes_are_normalized_and_unique_in_any_case() {
        let (db, issuer, listener) = setup(IssuerPolicy::default()).await;

        let first = issuer.create(gift("abc123"), "clerk-1").await.unwrap();
        assert_eq!(first.code, "ABC123");

        for attempt in ["ABC123", "abc123", "AbC123"] {
            let err = rejection(issuer.create(gift(attempt), "clerk-2").await);
            assert_eq!(
                err,
                ValidationError::DuplicateCode {
                    code: "ABC123".to_string()
                }
            );
        }

        assert_eq!(db.vouchers().count().await.unwrap(), 1);
        assert_eq!(listener.events().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_reported_before_later_rules() {
        let (_, issuer, _) = setup(IssuerPolicy::default()).await;
        issuer.create(gift("TAKEN"), "clerk-1").await.unwrap();

        let used = gift("taken").marked_used_at(now());
        let err = rejection(issuer.create(used, "clerk-1").await);
        assert!(matches!(err, ValidationError::DuplicateCode { .. }));
    }

    #[tokio::test]
    async fn test_already_used_is_rejected() {
        let (db, issuer, _) = setup(IssuerPolicy::default()).await;

        let used_at = now() - Duration::hours(1);
        let err = rejection(issuer.create(gift("USED01").marked_used_at(used_at), "clerk-1").await);
        assert_eq!(
            err,
            ValidationError::AlreadyUsed {
                code: "USED01".to_string(),
                used_at,
            }
        );
        assert_eq!(db.vouchers().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_inverted_window_is_rejected() {
        let (_, issuer, _) = setup(IssuerPolicy::default()).await;
        let t1 = now() + Duration::days(1);
        let t2 = now() + Duration::days(5);

        let candidate = gift("WINDOW").starting_at(t2).expiring_at(t1);
        let err = rejection(issuer.create(candidate, "clerk-1").await);
        assert_eq!(
            err,
            ValidationError::StartsAfterExpiry {
                code: "WINDOW".to_string(),
                starts_at: t2,
                expires_at: t1,
            }
        );

        // A zero-length window is allowed.
        let instant = gift("INSTANT").starting_at(t1).expiring_at(t1);
        assert!(issuer.create(instant, "clerk-1").await.is_ok());
    }

    #[tokio::test]
    async fn test_expiry_interval_default() {
        let policy = IssuerPolicy::default().with_expiry_interval(Some(Duration::days(30)));
        let (_, issuer, _) = setup(policy).await;
        let starts = now() + Duration::days(2);

        let voucher = issuer
            .create(gift("MONTH").starting_at(starts), "clerk-1")
            .await
            .unwrap();
        assert_eq!(voucher.starts_at, Some(starts));
        assert_eq!(voucher.expires_at, Some(starts + Duration::days(30)));

        // An explicit expiry wins over the interval.
        let explicit = starts + Duration::days(3);
        let voucher = issuer
            .create(gift("SHORT").starting_at(starts).expiring_at(explicit), "clerk-1")
            .await
            .unwrap();
        assert_eq!(voucher.expires_at, Some(explicit));
    }

    #[tokio::test]
    async fn test_deferred_mode_returns_in_memory_voucher_and_notifies_once() {
        let (db, issuer, listener) = setup(IssuerPolicy::default()).await;
        let usage = VoucherUsage {
            id: "u-1".to_string(),
            amount: Money::from_cents(300),
            recorded_at: now(),
            reference: None,
        };

        let mut tx = db.begin().await.unwrap();
        let voucher = issuer
            .create_in(&mut tx, gift("deferred").with_usage(usage), "clerk-1")
            .await
            .unwrap();

        assert_eq!(voucher.code, "DEFERRED");
        assert_eq!(voucher.balance(), Money::from_cents(700));
        assert_eq!(listener.events().len(), 1);

        tx.commit().await.unwrap();

        let stored = db.vouchers().get_by_code("deferred").await.unwrap().unwrap();
        assert_eq!(stored, voucher);
        assert_eq!(listener.events().len(), 1);
    }

    #[tokio::test]
    async fn test_deferred_rollback_leaves_nothing() {
        let (db, issuer, listener) = setup(IssuerPolicy::default()).await;

        let mut tx = db.begin().await.unwrap();
        issuer
            .create_in(&mut tx, gift("GONE"), "clerk-1")
            .await
            .unwrap();
        tx.rollback().await.unwrap();

        assert!(!db.vouchers().exists("GONE").await.unwrap());
        assert_eq!(listener.events().len(), 1);
    }

    #[tokio::test]
    async fn test_deferred_mode_sees_its_own_writes() {
        let (db, issuer, _) = setup(IssuerPolicy::default()).await;

        let mut tx = db.begin().await.unwrap();
        issuer.create_in(&mut tx, gift("TWICE"), "clerk-1").await.unwrap();
        let err = rejection(issuer.create_in(&mut tx, gift("twice"), "clerk-1").await);
        assert!(matches!(err, ValidationError::DuplicateCode { .. }));
        tx.commit().await.unwrap();

        assert_eq!(db.vouchers().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_existing_authorship_is_kept() {
        let (_, issuer, _) = setup(IssuerPolicy::default()).await;
        let earlier = now() - Duration::days(7);

        let voucher = issuer
            .create(
                gift("IMPORT").with_authorship(Authorship::new("importer", earlier)),
                "clerk-1",
            )
            .await
            .unwrap();

        assert_eq!(voucher.created_at(), Some(earlier));
        assert_eq!(voucher.starts_at, Some(earlier));
        assert_eq!(voucher.authorship.unwrap().created_by(), "importer");
    }

    #[tokio::test]
    async fn test_purchased_as_item_must_exist() {
        let (db, issuer, listener) = setup(IssuerPolicy::default()).await;

        let err = issuer
            .create(gift("ORPHAN").purchased_as("no-such-item"), "clerk-1")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            IssueError::Db(DbError::ForeignKeyViolation { .. })
        ));
        assert!(listener.events().is_empty());

        let item = CatalogItem {
            id: generate_item_id(),
            sku: "GIFTCARD-10".to_string(),
            name: "Gift card".to_string(),
            price: Money::from_major_minor(10, 0),
            currency: "GBP".to_string(),
            created_at: now(),
        };
        db.items().insert(&item).await.unwrap();

        let voucher = issuer
            .create(gift("SOLD").purchased_as(item.id.as_str()), "clerk-1")
            .await
            .unwrap();
        assert_eq!(voucher.purchased_as_item.as_deref(), Some(item.id.as_str()));
    }

    #[test]
    fn test_unique_violation_on_code_becomes_conflict() {
        let err = conflict_or_db(DbError::duplicate("vouchers.code", "ABC123"), "ABC123");
        assert!(matches!(err, IssueError::Conflict { ref code } if code == "ABC123"));

        let err = conflict_or_db(DbError::Busy("database is locked".to_string()), "ABC123");
        assert!(matches!(err, IssueError::Conflict { ref code } if code == "ABC123"));

        let err = conflict_or_db(DbError::duplicate("voucher_usage.id", "u-1"), "ABC123");
        assert!(matches!(err, IssueError::Db(DbError::UniqueViolation { .. })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_issuance_of_one_code() {
        const ROUNDS: usize = 10;
        const CONTENDERS: usize = 6;

        let path = std::env::temp_dir().join(format!("facevalue-race-{}.db", uuid::Uuid::new_v4()));
        let db = Database::new(DbConfig::new(&path).max_connections(8))
            .await
            .unwrap();
        let listener = Arc::new(RecordingListener::default());
        let issuer = VoucherIssuer::new(db.clone()).with_listener(listener.clone());

        for round in 0..ROUNDS {
            let code = format!("race{round}");
            let handles: Vec<_> = (0..CONTENDERS)
                .map(|_| {
                    let issuer = issuer.clone();
                    let code = code.clone();
                    tokio::spawn(async move { issuer.create(gift(&code), "clerk-1").await })
                })
                .collect();

            let mut issued = 0;
            for handle in handles {
                match handle.await.unwrap() {
                    Ok(voucher) => {
                        assert_eq!(voucher.code, code.to_uppercase());
                        issued += 1;
                    }
                    Err(IssueError::Rejected(ValidationError::DuplicateCode { .. }))
                    | Err(IssueError::Conflict { .. }) => {}
                    Err(other) => panic!("unexpected outcome for {code}: {other:?}"),
                }
            }
            assert_eq!(issued, 1, "exactly one issuance of {code} wins");
        }

        assert_eq!(db.vouchers().count().await.unwrap(), ROUNDS as i64);
        assert_eq!(listener.events().len(), ROUNDS);

        db.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
        }
    }
}
