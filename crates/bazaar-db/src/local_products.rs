//! Database operations for `local_products` and `product_images`.

use bazaar_core::{LocalProduct, NewLocalProduct, ProductImage, ProductStatus};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const LOCAL_PRODUCT_COLUMNS: &str = "id, vendor_id, stored_item_id, name, slug, description, \
     sku, price, currency_code, inventory_count, tags, status, created_at";

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `local_products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LocalProductRow {
    pub id: i64,
    pub vendor_id: Option<Uuid>,
    pub stored_item_id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub sku: Option<String>,
    pub price: Decimal,
    pub currency_code: String,
    pub inventory_count: i32,
    pub tags: Vec<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<LocalProductRow> for LocalProduct {
    type Error = DbError;

    fn try_from(row: LocalProductRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            vendor_id: row.vendor_id,
            stored_item_id: row.stored_item_id,
            name: row.name,
            slug: row.slug,
            description: row.description,
            sku: row.sku,
            price: row.price,
            currency_code: row.currency_code,
            inventory_count: row.inventory_count,
            tags: row.tags,
            status: row.status.parse::<ProductStatus>()?,
            created_at: row.created_at,
        })
    }
}

/// A row from the `product_images` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductImageRow {
    pub id: i64,
    pub product_id: i64,
    pub url: String,
    pub position: i32,
}

impl From<ProductImageRow> for ProductImage {
    fn from(row: ProductImageRow) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            url: row.url,
            position: row.position,
        }
    }
}

// ---------------------------------------------------------------------------
// local_products operations
// ---------------------------------------------------------------------------

/// Inserts a marketplace product and returns the full row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails, including a foreign-key
/// violation when `product.stored_item_id` does not exist.
pub async fn insert_local_product(
    pool: &PgPool,
    product: &NewLocalProduct,
) -> Result<LocalProduct, DbError> {
    let row = sqlx::query_as::<_, LocalProductRow>(&format!(
        "INSERT INTO local_products \
             (vendor_id, stored_item_id, name, slug, description, sku, price, \
              currency_code, inventory_count, tags, status) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         RETURNING {LOCAL_PRODUCT_COLUMNS}"
    ))
    .bind(product.vendor_id)
    .bind(product.stored_item_id)
    .bind(&product.name)
    .bind(&product.slug)
    .bind(product.description.as_deref())
    .bind(product.sku.as_deref())
    .bind(product.price)
    .bind(&product.currency_code)
    .bind(product.inventory_count)
    .bind(&product.tags)
    .bind(product.status.as_str())
    .fetch_one(pool)
    .await?;

    LocalProduct::try_from(row)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_local_product(pool: &PgPool, id: i64) -> Result<Option<LocalProduct>, DbError> {
    let row = sqlx::query_as::<_, LocalProductRow>(&format!(
        "SELECT {LOCAL_PRODUCT_COLUMNS} FROM local_products WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(LocalProduct::try_from).transpose()
}

/// Deletes a product. Its images go with it (`ON DELETE CASCADE`) and any
/// mirror row pointing at it is unlinked (`ON DELETE SET NULL`).
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no product has `id`, or [`DbError::Sqlx`]
/// if the delete fails.
pub async fn delete_local_product(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM local_products WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound {
            entity: "local product",
            key: id.to_string(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// product_images operations
// ---------------------------------------------------------------------------

/// Inserts one image at `position`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails, including a unique
/// violation on `(product_id, position)`.
pub async fn insert_product_image(
    pool: &PgPool,
    product_id: i64,
    url: &str,
    position: i32,
) -> Result<ProductImage, DbError> {
    let row = sqlx::query_as::<_, ProductImageRow>(
        "INSERT INTO product_images (product_id, url, position) \
         VALUES ($1, $2, $3) \
         RETURNING id, product_id, url, position",
    )
    .bind(product_id)
    .bind(url)
    .bind(position)
    .fetch_one(pool)
    .await?;

    Ok(row.into())
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_product_images(
    pool: &PgPool,
    product_id: i64,
) -> Result<Vec<ProductImage>, DbError> {
    let rows = sqlx::query_as::<_, ProductImageRow>(
        "SELECT id, product_id, url, position FROM product_images \
         WHERE product_id = $1 ORDER BY position",
    )
    .bind(product_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(ProductImage::from).collect())
}
