//! In-process [`CatalogStore`] used for dry runs and tests.
//!
//! Mirrors the Postgres schema's keys and constraints closely enough that
//! import logic behaves the same against either store: `external_id` is
//! unique, variants are keyed by `(stored_item_id, external_variant_id)`,
//! images by `(product_id, position)`, and deleting a product drops its
//! images and unlinks its mirror row.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use bazaar_core::{
    CatalogStore, ImportJob, ImportStatus, JobStatus, LocalProduct, NewLocalProduct,
    ProductImage, RemoteCatalogItem, RemoteVariant, StoreError, StoredCatalogItem, StoredVariant,
};
use chrono::Utc;
use uuid::Uuid;

/// Writes the memory store should refuse, for exercising failure paths.
#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    /// `insert_local_product` fails for products with these names.
    pub product_names: HashSet<String>,
    /// `insert_product_image` fails for these URLs.
    pub image_urls: HashSet<String>,
    /// Every `mark_stored_item_imported` fails.
    pub link_updates: bool,
    /// Every `mark_stored_item_failed` fails.
    pub status_updates: bool,
    /// Every `delete_local_product` fails.
    pub product_deletes: bool,
    /// Every `update_import_job` fails.
    pub job_updates: bool,
}

impl FaultPlan {
    #[must_use]
    pub fn fail_product_named(mut self, name: impl Into<String>) -> Self {
        self.product_names.insert(name.into());
        self
    }

    #[must_use]
    pub fn fail_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_urls.insert(url.into());
        self
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    last_id: i64,
    items: BTreeMap<i64, StoredCatalogItem>,
    item_ids_by_external: HashMap<String, i64>,
    variants: BTreeMap<i64, StoredVariant>,
    products: BTreeMap<i64, LocalProduct>,
    images: BTreeMap<i64, ProductImage>,
    jobs: BTreeMap<i64, ImportJob>,
}

impl MemoryState {
    /// One sequence shared by every table; ids only need to be unique per table.
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

#[derive(Debug, Default)]
pub struct MemoryCatalogStore {
    state: Mutex<MemoryState>,
    faults: Mutex<FaultPlan>,
}

impl MemoryCatalogStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_faults(faults: FaultPlan) -> Self {
        Self {
            state: Mutex::default(),
            faults: Mutex::new(faults),
        }
    }

    pub fn set_faults(&self, faults: FaultPlan) {
        *self.faults.lock().unwrap_or_else(PoisonError::into_inner) = faults;
    }

    #[must_use]
    pub fn local_product_count(&self) -> usize {
        self.state().products.len()
    }

    #[must_use]
    pub fn product_image_count(&self) -> usize {
        self.state().images.len()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_fault(&self, refuse: impl FnOnce(&FaultPlan) -> bool, what: &str) -> Result<(), StoreError> {
        let faults = self.faults.lock().unwrap_or_else(PoisonError::into_inner);
        if refuse(&faults) {
            return Err(StoreError::Backend(format!("injected failure: {what}")));
        }
        Ok(())
    }
}

fn item_not_found(id: i64) -> StoreError {
    StoreError::NotFound {
        entity: "stored catalog item",
        key: id.to_string(),
    }
}

impl CatalogStore for MemoryCatalogStore {
    async fn upsert_stored_item(
        &self,
        item: &RemoteCatalogItem,
    ) -> Result<StoredCatalogItem, StoreError> {
        let now = Utc::now();
        let mut state = self.state();

        if let Some(&id) = state.item_ids_by_external.get(&item.external_id) {
            let stored = state.items.get_mut(&id).ok_or_else(|| item_not_found(id))?;
            stored.title.clone_from(&item.title);
            stored.description.clone_from(&item.description);
            stored.sku.clone_from(&item.sku);
            stored.price = item.price;
            stored.currency_code.clone_from(&item.currency_code);
            stored.inventory_count = item.inventory_count;
            stored.images.clone_from(&item.images);
            stored.tags.clone_from(&item.tags);
            stored.categories.clone_from(&item.categories);
            stored.vendor.clone_from(&item.vendor);
            stored.updated_at = now;
            return Ok(stored.clone());
        }

        let id = state.next_id();
        let stored = StoredCatalogItem {
            id,
            external_id: item.external_id.clone(),
            title: item.title.clone(),
            description: item.description.clone(),
            sku: item.sku.clone(),
            price: item.price,
            currency_code: item.currency_code.clone(),
            inventory_count: item.inventory_count,
            images: item.images.clone(),
            tags: item.tags.clone(),
            categories: item.categories.clone(),
            vendor: item.vendor.clone(),
            import_status: ImportStatus::Pending,
            local_product_id: None,
            imported_at: None,
            created_at: now,
            updated_at: now,
        };
        state.item_ids_by_external.insert(item.external_id.clone(), id);
        state.items.insert(id, stored.clone());
        Ok(stored)
    }

    async fn upsert_stored_variant(
        &self,
        stored_item_id: i64,
        variant: &RemoteVariant,
    ) -> Result<StoredVariant, StoreError> {
        let now = Utc::now();
        let mut state = self.state();
        if !state.items.contains_key(&stored_item_id) {
            return Err(StoreError::Constraint(format!(
                "stored catalog item {stored_item_id} does not exist"
            )));
        }

        let existing = state
            .variants
            .values_mut()
            .find(|v| {
                v.stored_item_id == stored_item_id && v.external_variant_id == variant.external_id
            });
        if let Some(stored) = existing {
            stored.title.clone_from(&variant.title);
            stored.sku.clone_from(&variant.sku);
            stored.price = variant.price;
            stored.inventory_count = variant.inventory_count;
            stored.options.clone_from(&variant.options);
            stored.updated_at = now;
            return Ok(stored.clone());
        }

        let id = state.next_id();
        let stored = StoredVariant {
            id,
            stored_item_id,
            external_variant_id: variant.external_id.clone(),
            title: variant.title.clone(),
            sku: variant.sku.clone(),
            price: variant.price,
            inventory_count: variant.inventory_count,
            options: variant.options.clone(),
            updated_at: now,
        };
        state.variants.insert(id, stored.clone());
        Ok(stored)
    }

    async fn get_stored_item(
        &self,
        external_id: &str,
    ) -> Result<Option<StoredCatalogItem>, StoreError> {
        let state = self.state();
        Ok(state
            .item_ids_by_external
            .get(external_id)
            .and_then(|id| state.items.get(id))
            .cloned())
    }

    async fn list_stored_variants(
        &self,
        stored_item_id: i64,
    ) -> Result<Vec<StoredVariant>, StoreError> {
        Ok(self
            .state()
            .variants
            .values()
            .filter(|v| v.stored_item_id == stored_item_id)
            .cloned()
            .collect())
    }

    async fn count_stored_items(&self) -> Result<i64, StoreError> {
        Ok(i64::try_from(self.state().items.len()).unwrap_or(i64::MAX))
    }

    async fn mark_stored_item_imported(
        &self,
        stored_item_id: i64,
        local_product_id: i64,
    ) -> Result<(), StoreError> {
        self.check_fault(|f| f.link_updates, "link stored item")?;
        let now = Utc::now();
        let mut state = self.state();
        if !state.products.contains_key(&local_product_id) {
            return Err(StoreError::Constraint(format!(
                "local product {local_product_id} does not exist"
            )));
        }
        let stored = state
            .items
            .get_mut(&stored_item_id)
            .ok_or_else(|| item_not_found(stored_item_id))?;
        stored.import_status = ImportStatus::Imported;
        stored.local_product_id = Some(local_product_id);
        stored.imported_at = Some(now);
        stored.updated_at = now;
        Ok(())
    }

    async fn mark_stored_item_failed(&self, stored_item_id: i64) -> Result<(), StoreError> {
        self.check_fault(|f| f.status_updates, "mark stored item failed")?;
        let mut state = self.state();
        let stored = state
            .items
            .get_mut(&stored_item_id)
            .ok_or_else(|| item_not_found(stored_item_id))?;
        stored.import_status = ImportStatus::Failed;
        stored.updated_at = Utc::now();
        Ok(())
    }

    async fn insert_local_product(
        &self,
        product: &NewLocalProduct,
    ) -> Result<LocalProduct, StoreError> {
        self.check_fault(
            |f| f.product_names.contains(&product.name),
            &format!("insert product \"{}\"", product.name),
        )?;
        let mut state = self.state();
        if !state.items.contains_key(&product.stored_item_id) {
            return Err(StoreError::Constraint(format!(
                "stored catalog item {} does not exist",
                product.stored_item_id
            )));
        }

        let id = state.next_id();
        let created = LocalProduct {
            id,
            vendor_id: product.vendor_id,
            stored_item_id: product.stored_item_id,
            name: product.name.clone(),
            slug: product.slug.clone(),
            description: product.description.clone(),
            sku: product.sku.clone(),
            price: product.price,
            currency_code: product.currency_code.clone(),
            inventory_count: product.inventory_count,
            tags: product.tags.clone(),
            status: product.status,
            created_at: Utc::now(),
        };
        state.products.insert(id, created.clone());
        Ok(created)
    }

    async fn get_local_product(&self, id: i64) -> Result<Option<LocalProduct>, StoreError> {
        Ok(self.state().products.get(&id).cloned())
    }

    async fn delete_local_product(&self, id: i64) -> Result<(), StoreError> {
        self.check_fault(|f| f.product_deletes, "delete product")?;
        let mut state = self.state();
        if state.products.remove(&id).is_none() {
            return Err(StoreError::NotFound {
                entity: "local product",
                key: id.to_string(),
            });
        }
        state.images.retain(|_, img| img.product_id != id);
        for item in state.items.values_mut() {
            if item.local_product_id == Some(id) {
                item.local_product_id = None;
            }
        }
        Ok(())
    }

    async fn insert_product_image(
        &self,
        product_id: i64,
        url: &str,
        position: i32,
    ) -> Result<ProductImage, StoreError> {
        self.check_fault(
            |f| f.image_urls.contains(url),
            &format!("insert image {url}"),
        )?;
        let mut state = self.state();
        if !state.products.contains_key(&product_id) {
            return Err(StoreError::Constraint(format!(
                "local product {product_id} does not exist"
            )));
        }
        if position < 0 {
            return Err(StoreError::Constraint(format!(
                "image position {position} is negative"
            )));
        }
        if state
            .images
            .values()
            .any(|img| img.product_id == product_id && img.position == position)
        {
            return Err(StoreError::Conflict(format!(
                "product {product_id} already has an image at position {position}"
            )));
        }

        let id = state.next_id();
        let image = ProductImage {
            id,
            product_id,
            url: url.to_owned(),
            position,
        };
        state.images.insert(id, image.clone());
        Ok(image)
    }

    async fn list_product_images(&self, product_id: i64) -> Result<Vec<ProductImage>, StoreError> {
        let mut images: Vec<ProductImage> = self
            .state()
            .images
            .values()
            .filter(|img| img.product_id == product_id)
            .cloned()
            .collect();
        images.sort_by_key(|img| img.position);
        Ok(images)
    }

    async fn create_import_job(&self, total: i32) -> Result<ImportJob, StoreError> {
        if total < 0 {
            return Err(StoreError::Constraint(format!(
                "job total {total} is negative"
            )));
        }
        let now = Utc::now();
        let mut state = self.state();
        let id = state.next_id();
        let job = ImportJob {
            id,
            public_id: Uuid::new_v4(),
            total,
            processed: 0,
            succeeded: 0,
            failed: 0,
            status: JobStatus::Processing,
            started_at: Some(now),
            completed_at: None,
            error_message: None,
            created_at: now,
        };
        state.jobs.insert(id, job.clone());
        Ok(job)
    }

    async fn update_import_job(&self, job: &ImportJob) -> Result<(), StoreError> {
        self.check_fault(|f| f.job_updates, "update import job")?;
        if job.processed != job.succeeded + job.failed || job.processed > job.total {
            return Err(StoreError::Constraint(format!(
                "import job {} counters are inconsistent",
                job.id
            )));
        }
        let mut state = self.state();
        let stored = state.jobs.get_mut(&job.id).ok_or(StoreError::NotFound {
            entity: "import job",
            key: job.id.to_string(),
        })?;
        stored.processed = job.processed;
        stored.succeeded = job.succeeded;
        stored.failed = job.failed;
        stored.status = job.status;
        stored.completed_at = job.completed_at;
        stored.error_message.clone_from(&job.error_message);
        Ok(())
    }

    async fn get_import_job(&self, id: i64) -> Result<Option<ImportJob>, StoreError> {
        Ok(self.state().jobs.get(&id).cloned())
    }

    async fn list_import_jobs(&self, limit: i64) -> Result<Vec<ImportJob>, StoreError> {
        let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
        Ok(self
            .state()
            .jobs
            .values()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
