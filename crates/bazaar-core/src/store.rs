//! Persistence seam for the import pipeline.
//!
//! Implemented by the Postgres and in-memory stores in `bazaar-db`. Each
//! method is a single independent write or read; there is no transaction
//! spanning calls, so callers that need all-or-nothing behavior must
//! compensate themselves.

use std::future::Future;

use thiserror::Error;

use crate::catalog::{RemoteCatalogItem, RemoteVariant, StoredCatalogItem, StoredVariant};
use crate::jobs::ImportJob;
use crate::products::{LocalProduct, NewLocalProduct, ProductImage};

/// Local storage write or read failure. Never retried by the pipeline.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("storage backend error: {0}")]
    Backend(String),
}

pub trait CatalogStore: Send + Sync {
    /// Inserts or replaces the mirror row for `item.external_id`.
    ///
    /// On conflict every mirrored field is overwritten; `import_status`,
    /// `local_product_id`, and `imported_at` keep their existing values.
    fn upsert_stored_item(
        &self,
        item: &RemoteCatalogItem,
    ) -> impl Future<Output = Result<StoredCatalogItem, StoreError>> + Send;

    /// Inserts or replaces the variant keyed by `(stored_item_id, variant.external_id)`.
    fn upsert_stored_variant(
        &self,
        stored_item_id: i64,
        variant: &RemoteVariant,
    ) -> impl Future<Output = Result<StoredVariant, StoreError>> + Send;

    fn get_stored_item(
        &self,
        external_id: &str,
    ) -> impl Future<Output = Result<Option<StoredCatalogItem>, StoreError>> + Send;

    fn list_stored_variants(
        &self,
        stored_item_id: i64,
    ) -> impl Future<Output = Result<Vec<StoredVariant>, StoreError>> + Send;

    fn count_stored_items(&self) -> impl Future<Output = Result<i64, StoreError>> + Send;

    /// Points the mirror row at its marketplace product and advances it to `imported`.
    fn mark_stored_item_imported(
        &self,
        stored_item_id: i64,
        local_product_id: i64,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn mark_stored_item_failed(
        &self,
        stored_item_id: i64,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn insert_local_product(
        &self,
        product: &NewLocalProduct,
    ) -> impl Future<Output = Result<LocalProduct, StoreError>> + Send;

    fn get_local_product(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<Option<LocalProduct>, StoreError>> + Send;

    /// Deletes a product together with its image records.
    fn delete_local_product(&self, id: i64)
        -> impl Future<Output = Result<(), StoreError>> + Send;

    fn insert_product_image(
        &self,
        product_id: i64,
        url: &str,
        position: i32,
    ) -> impl Future<Output = Result<ProductImage, StoreError>> + Send;

    /// Returns images ordered by `position`.
    fn list_product_images(
        &self,
        product_id: i64,
    ) -> impl Future<Output = Result<Vec<ProductImage>, StoreError>> + Send;

    /// Creates a job in `processing` state with `started_at` set.
    fn create_import_job(
        &self,
        total: i32,
    ) -> impl Future<Output = Result<ImportJob, StoreError>> + Send;

    /// Persists the counters, status, and timestamps of `job`.
    fn update_import_job(
        &self,
        job: &ImportJob,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn get_import_job(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<Option<ImportJob>, StoreError>> + Send;

    /// Most recent jobs first.
    fn list_import_jobs(
        &self,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<ImportJob>, StoreError>> + Send;
}
