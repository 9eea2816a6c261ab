//! # Catalog Item Repository
//!
//! Database operations for the items a voucher can be sold as.
//! A voucher's `purchased_as_item` must name a row in this table.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use facevalue_core::{CatalogItem, Money};

#[derive(Debug, FromRow)]
struct ItemRow {
    id: String,
    sku: String,
    name: String,
    price_cents: i64,
    currency: String,
    created_at: DateTime<Utc>,
}

impl From<ItemRow> for CatalogItem {
    fn from(row: ItemRow) -> Self {
        CatalogItem {
            id: row.id,
            sku: row.sku,
            name: row.name,
            price: Money::from_cents(row.price_cents),
            currency: row.currency,
            created_at: row.created_at,
        }
    }
}

/// Repository for catalog item database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.items();
///
/// let item = repo.get_by_sku("GIFTCARD-25").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ItemRepository {
    pool: SqlitePool,
}

impl ItemRepository {
    /// Creates a new ItemRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ItemRepository { pool }
    }

    /// Gets an item by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(CatalogItem))` - Item found
    /// * `Ok(None)` - Item not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<CatalogItem>> {
        let row = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT id, sku, name, price_cents, currency, created_at
            FROM catalog_items
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CatalogItem::from))
    }

    /// Gets an item by its SKU.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<CatalogItem>> {
        let row = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT id, sku, name, price_cents, currency, created_at
            FROM catalog_items
            WHERE sku = ?1
            "#,
        )
        .bind(sku)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CatalogItem::from))
    }

    /// Inserts a new item.
    ///
    /// ## Arguments
    /// * `item` - Item to insert (id should be generated beforehand)
    ///
    /// ## Returns
    /// * `Ok(CatalogItem)` - The inserted item
    /// * `Err(DbError::UniqueViolation)` - SKU or id already exists
    pub async fn insert(&self, item: &CatalogItem) -> DbResult<CatalogItem> {
        debug!(sku = %item.sku, "Inserting catalog item");

        sqlx::query(
            r#"
            INSERT INTO catalog_items (id, sku, name, price_cents, currency, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&item.id)
        .bind(&item.sku)
        .bind(&item.name)
        .bind(item.price.cents())
        .bind(&item.currency)
        .bind(item.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: item.sku.clone(),
            },
            other => other,
        })?;

        Ok(item.clone())
    }

    /// Counts catalog items (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM catalog_items")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Helper to generate a new item ID.
///
/// ## Usage
/// ```rust,ignore
/// let id = generate_item_id();
/// let item = CatalogItem { id, ... };
/// ```
pub fn generate_item_id() -> String {
    Uuid::new_v4().to_string()
}
