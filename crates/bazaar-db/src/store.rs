//! [`CatalogStore`] backed by Postgres.

use bazaar_core::{
    CatalogStore, ImportJob, LocalProduct, NewLocalProduct, ProductImage, RemoteCatalogItem,
    RemoteVariant, StoreError, StoredCatalogItem, StoredVariant,
};
use sqlx::PgPool;

use crate::{catalog_items, import_jobs, local_products};

/// Thin adapter from the query functions in this crate to [`CatalogStore`].
#[derive(Debug, Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl CatalogStore for PgCatalogStore {
    async fn upsert_stored_item(
        &self,
        item: &RemoteCatalogItem,
    ) -> Result<StoredCatalogItem, StoreError> {
        Ok(catalog_items::upsert_stored_item(&self.pool, item).await?)
    }

    async fn upsert_stored_variant(
        &self,
        stored_item_id: i64,
        variant: &RemoteVariant,
    ) -> Result<StoredVariant, StoreError> {
        Ok(catalog_items::upsert_stored_variant(&self.pool, stored_item_id, variant).await?)
    }

    async fn get_stored_item(
        &self,
        external_id: &str,
    ) -> Result<Option<StoredCatalogItem>, StoreError> {
        Ok(catalog_items::get_stored_item_by_external_id(&self.pool, external_id).await?)
    }

    async fn list_stored_variants(
        &self,
        stored_item_id: i64,
    ) -> Result<Vec<StoredVariant>, StoreError> {
        Ok(catalog_items::list_stored_variants(&self.pool, stored_item_id).await?)
    }

    async fn count_stored_items(&self) -> Result<i64, StoreError> {
        Ok(catalog_items::count_stored_items(&self.pool).await?)
    }

    async fn mark_stored_item_imported(
        &self,
        stored_item_id: i64,
        local_product_id: i64,
    ) -> Result<(), StoreError> {
        Ok(
            catalog_items::mark_stored_item_imported(&self.pool, stored_item_id, local_product_id)
                .await?,
        )
    }

    async fn mark_stored_item_failed(&self, stored_item_id: i64) -> Result<(), StoreError> {
        Ok(catalog_items::mark_stored_item_failed(&self.pool, stored_item_id).await?)
    }

    async fn insert_local_product(
        &self,
        product: &NewLocalProduct,
    ) -> Result<LocalProduct, StoreError> {
        Ok(local_products::insert_local_product(&self.pool, product).await?)
    }

    async fn get_local_product(&self, id: i64) -> Result<Option<LocalProduct>, StoreError> {
        Ok(local_products::get_local_product(&self.pool, id).await?)
    }

    async fn delete_local_product(&self, id: i64) -> Result<(), StoreError> {
        Ok(local_products::delete_local_product(&self.pool, id).await?)
    }

    async fn insert_product_image(
        &self,
        product_id: i64,
        url: &str,
        position: i32,
    ) -> Result<ProductImage, StoreError> {
        Ok(local_products::insert_product_image(&self.pool, product_id, url, position).await?)
    }

    async fn list_product_images(&self, product_id: i64) -> Result<Vec<ProductImage>, StoreError> {
        Ok(local_products::list_product_images(&self.pool, product_id).await?)
    }

    async fn create_import_job(&self, total: i32) -> Result<ImportJob, StoreError> {
        Ok(import_jobs::create_import_job(&self.pool, total).await?)
    }

    async fn update_import_job(&self, job: &ImportJob) -> Result<(), StoreError> {
        Ok(import_jobs::update_import_job(&self.pool, job).await?)
    }

    async fn get_import_job(&self, id: i64) -> Result<Option<ImportJob>, StoreError> {
        Ok(import_jobs::get_import_job(&self.pool, id).await?)
    }

    async fn list_import_jobs(&self, limit: i64) -> Result<Vec<ImportJob>, StoreError> {
        Ok(import_jobs::list_import_jobs(&self.pool, limit).await?)
    }
}
