//! Database operations for `stored_catalog_items` and `stored_variants`.

use std::collections::BTreeMap;

use bazaar_core::{ImportStatus, RemoteCatalogItem, RemoteVariant, StoredCatalogItem, StoredVariant};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::DbError;

const STORED_ITEM_COLUMNS: &str = "id, external_id, title, description, sku, price, \
     currency_code, inventory_count, images, tags, categories, vendor, import_status, \
     local_product_id, imported_at, created_at, updated_at";

const STORED_VARIANT_COLUMNS: &str = "id, stored_item_id, external_variant_id, title, sku, \
     price, inventory_count, options, updated_at";

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `stored_catalog_items` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredItemRow {
    pub id: i64,
    pub external_id: String,
    pub title: String,
    pub description: Option<String>,
    pub sku: Option<String>,
    pub price: Decimal,
    pub currency_code: String,
    pub inventory_count: i32,
    pub images: Vec<String>,
    pub tags: Vec<String>,
    pub categories: Vec<String>,
    pub vendor: Option<String>,
    /// One of `pending`, `imported`, `failed` (enforced by a CHECK constraint).
    pub import_status: String,
    /// Nulled by the database when the linked product is deleted.
    pub local_product_id: Option<i64>,
    pub imported_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<StoredItemRow> for StoredCatalogItem {
    type Error = DbError;

    fn try_from(row: StoredItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            external_id: row.external_id,
            title: row.title,
            description: row.description,
            sku: row.sku,
            price: row.price,
            currency_code: row.currency_code,
            inventory_count: row.inventory_count,
            images: row.images,
            tags: row.tags,
            categories: row.categories,
            vendor: row.vendor,
            import_status: row.import_status.parse::<ImportStatus>()?,
            local_product_id: row.local_product_id,
            imported_at: row.imported_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// A row from the `stored_variants` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredVariantRow {
    pub id: i64,
    pub stored_item_id: i64,
    pub external_variant_id: String,
    pub title: String,
    pub sku: Option<String>,
    pub price: Decimal,
    pub inventory_count: i32,
    pub options: Json<BTreeMap<String, String>>,
    pub updated_at: DateTime<Utc>,
}

impl From<StoredVariantRow> for StoredVariant {
    fn from(row: StoredVariantRow) -> Self {
        Self {
            id: row.id,
            stored_item_id: row.stored_item_id,
            external_variant_id: row.external_variant_id,
            title: row.title,
            sku: row.sku,
            price: row.price,
            inventory_count: row.inventory_count,
            options: row.options.0,
            updated_at: row.updated_at,
        }
    }
}

// ---------------------------------------------------------------------------
// stored_catalog_items operations
// ---------------------------------------------------------------------------

/// Upserts the mirror row for `item.external_id`.
///
/// Conflicts on `external_id` overwrite every mirrored field and bump
/// `updated_at`. `import_status`, `local_product_id`, and `imported_at` are
/// left alone so a refresh never rolls back an earlier import.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::InvalidStatus`]
/// if the stored status is unrecognized.
pub async fn upsert_stored_item(
    pool: &PgPool,
    item: &RemoteCatalogItem,
) -> Result<StoredCatalogItem, DbError> {
    let row = sqlx::query_as::<_, StoredItemRow>(&format!(
        "INSERT INTO stored_catalog_items \
             (external_id, title, description, sku, price, currency_code, \
              inventory_count, images, tags, categories, vendor) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         ON CONFLICT (external_id) DO UPDATE SET \
             title           = EXCLUDED.title, \
             description     = EXCLUDED.description, \
             sku             = EXCLUDED.sku, \
             price           = EXCLUDED.price, \
             currency_code   = EXCLUDED.currency_code, \
             inventory_count = EXCLUDED.inventory_count, \
             images          = EXCLUDED.images, \
             tags            = EXCLUDED.tags, \
             categories      = EXCLUDED.categories, \
             vendor          = EXCLUDED.vendor, \
             updated_at      = NOW() \
         RETURNING {STORED_ITEM_COLUMNS}"
    ))
    .bind(&item.external_id)
    .bind(&item.title)
    .bind(item.description.as_deref())
    .bind(item.sku.as_deref())
    .bind(item.price)
    .bind(&item.currency_code)
    .bind(item.inventory_count)
    .bind(&item.images)
    .bind(&item.tags)
    .bind(&item.categories)
    .bind(item.vendor.as_deref())
    .fetch_one(pool)
    .await?;

    StoredCatalogItem::try_from(row)
}

/// Returns the mirror row for `external_id`, or `None` if it was never stored.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_stored_item_by_external_id(
    pool: &PgPool,
    external_id: &str,
) -> Result<Option<StoredCatalogItem>, DbError> {
    let row = sqlx::query_as::<_, StoredItemRow>(&format!(
        "SELECT {STORED_ITEM_COLUMNS} FROM stored_catalog_items WHERE external_id = $1"
    ))
    .bind(external_id)
    .fetch_optional(pool)
    .await?;

    row.map(StoredCatalogItem::try_from).transpose()
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_stored_items(pool: &PgPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM stored_catalog_items")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Links the mirror row to its marketplace product and marks it `imported`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row has `stored_item_id`, or
/// [`DbError::Sqlx`] if the update fails (including a foreign-key violation
/// when `local_product_id` does not exist).
pub async fn mark_stored_item_imported(
    pool: &PgPool,
    stored_item_id: i64,
    local_product_id: i64,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE stored_catalog_items \
         SET import_status = 'imported', local_product_id = $1, \
             imported_at = NOW(), updated_at = NOW() \
         WHERE id = $2",
    )
    .bind(local_product_id)
    .bind(stored_item_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound {
            entity: "stored catalog item",
            key: stored_item_id.to_string(),
        });
    }
    Ok(())
}

/// Sets `import_status = 'failed'`. The product link and `imported_at` are untouched.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row has `stored_item_id`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn mark_stored_item_failed(pool: &PgPool, stored_item_id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE stored_catalog_items \
         SET import_status = 'failed', updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(stored_item_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound {
            entity: "stored catalog item",
            key: stored_item_id.to_string(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// stored_variants operations
// ---------------------------------------------------------------------------

/// Upserts a variant row.
///
/// Conflicts on `(stored_item_id, external_variant_id)` overwrite `title`,
/// `sku`, `price`, `inventory_count`, `options`, and `updated_at`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails, including a foreign-key
/// violation when `stored_item_id` does not exist.
pub async fn upsert_stored_variant(
    pool: &PgPool,
    stored_item_id: i64,
    variant: &RemoteVariant,
) -> Result<StoredVariant, DbError> {
    let row = sqlx::query_as::<_, StoredVariantRow>(&format!(
        "INSERT INTO stored_variants \
             (stored_item_id, external_variant_id, title, sku, price, inventory_count, options) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         ON CONFLICT (stored_item_id, external_variant_id) DO UPDATE SET \
             title           = EXCLUDED.title, \
             sku             = EXCLUDED.sku, \
             price           = EXCLUDED.price, \
             inventory_count = EXCLUDED.inventory_count, \
             options         = EXCLUDED.options, \
             updated_at      = NOW() \
         RETURNING {STORED_VARIANT_COLUMNS}"
    ))
    .bind(stored_item_id)
    .bind(&variant.external_id)
    .bind(&variant.title)
    .bind(variant.sku.as_deref())
    .bind(variant.price)
    .bind(variant.inventory_count)
    .bind(Json(&variant.options))
    .fetch_one(pool)
    .await?;

    Ok(row.into())
}

/// Returns the variants of a mirror row ordered by insertion.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_stored_variants(
    pool: &PgPool,
    stored_item_id: i64,
) -> Result<Vec<StoredVariant>, DbError> {
    let rows = sqlx::query_as::<_, StoredVariantRow>(&format!(
        "SELECT {STORED_VARIANT_COLUMNS} FROM stored_variants \
         WHERE stored_item_id = $1 ORDER BY id"
    ))
    .bind(stored_item_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(StoredVariant::from).collect())
}
