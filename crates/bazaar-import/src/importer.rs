//! Single-item import: mirror the remote item, then create and link its
//! marketplace product.

use std::sync::Arc;

use bazaar_core::{
    slugify, AppConfig, CatalogStore, LocalProduct, NewLocalProduct, Notifier, ProductStatus,
    RemoteCatalogItem, StoreError, StoredCatalogItem,
};
use bazaar_fulfillment::FulfillmentClient;
use futures::future::try_join_all;
use uuid::Uuid;

use crate::error::ImportError;

pub(crate) const DEFAULT_CHUNK_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSettings {
    /// Owner of created products. `None` leaves them unassigned.
    pub vendor_id: Option<Uuid>,
    /// Items imported concurrently per batch chunk.
    pub chunk_size: usize,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            vendor_id: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ImportSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            vendor_id: config.import_vendor_id,
            chunk_size: config.import_chunk_size.max(1),
        }
    }
}

/// Drives imports against a [`CatalogStore`].
pub struct Importer<S> {
    pub(crate) store: Arc<S>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) settings: ImportSettings,
}

impl<S: CatalogStore> Importer<S> {
    pub fn new(store: Arc<S>, notifier: Arc<dyn Notifier>, settings: ImportSettings) -> Self {
        Self {
            store,
            notifier,
            settings,
        }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub fn settings(&self) -> ImportSettings {
        self.settings
    }

    /// Imports one remote item and returns its marketplace product.
    ///
    /// Steps, in order:
    /// 1. upsert the mirror row keyed by `external_id`;
    /// 2. upsert every variant, concurrently;
    /// 3. derive the product slug;
    /// 4. insert the product in `pending` status;
    /// 5. link the mirror row to the product and mark it `imported`, while
    /// 6. inserting one image record per URL at its list position.
    ///
    /// If the mirror row already points at a product that still exists, the
    /// mirror and variants are refreshed and that product is returned; no
    /// duplicate is created.
    ///
    /// On failure after step 1 the mirror row is marked `failed` unless an
    /// earlier run already imported it. On failure after step 4 the new
    /// product and its images are deleted too. Rollback errors are logged and
    /// never replace the original error.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Store`] from the first failing step.
    pub async fn import_item(&self, remote: &RemoteCatalogItem) -> Result<LocalProduct, ImportError> {
        let stored = self.store.upsert_stored_item(remote).await?;

        let product = match self.create_product(&stored, remote).await {
            Ok(CreateOutcome::Existing(product)) => {
                tracing::info!(
                    external_id = %remote.external_id,
                    product_id = product.id,
                    "item already imported; refreshed mirror only"
                );
                return Ok(product);
            }
            Ok(CreateOutcome::Created(product)) => product,
            Err(err) => {
                self.mark_failed_best_effort(&stored).await;
                return Err(err.into());
            }
        };

        if let Err(err) = self.link_and_attach_images(&stored, &product, remote).await {
            tracing::warn!(
                external_id = %remote.external_id,
                product_id = product.id,
                error = %err,
                "import failed after product insert; rolling back"
            );
            self.delete_product_best_effort(&product).await;
            self.mark_failed_best_effort(&stored).await;
            return Err(err.into());
        }

        tracing::info!(
            external_id = %remote.external_id,
            product_id = product.id,
            slug = %product.slug,
            images = remote.images.len(),
            variants = remote.variants.len(),
            "imported catalog item"
        );
        Ok(product)
    }

    /// Fetches `external_id` from the provider and imports it.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Api`] if the fetch fails, otherwise anything
    /// [`Self::import_item`] returns.
    pub async fn fetch_and_import(
        &self,
        client: &FulfillmentClient,
        external_id: &str,
    ) -> Result<LocalProduct, ImportError> {
        let remote = client.fetch_item(external_id).await?;
        self.import_item(&remote).await
    }

    /// Steps 2 through 4, or the already-linked product.
    async fn create_product(
        &self,
        stored: &StoredCatalogItem,
        remote: &RemoteCatalogItem,
    ) -> Result<CreateOutcome, StoreError> {
        if remote.has_variants() {
            try_join_all(
                remote
                    .variants
                    .iter()
                    .map(|variant| self.store.upsert_stored_variant(stored.id, variant)),
            )
            .await?;
        }

        if let Some(product_id) = stored.local_product_id {
            if let Some(existing) = self.store.get_local_product(product_id).await? {
                return Ok(CreateOutcome::Existing(existing));
            }
        }

        let product = NewLocalProduct {
            vendor_id: self.settings.vendor_id,
            stored_item_id: stored.id,
            name: remote.title.clone(),
            slug: product_slug(remote),
            description: remote.description.clone(),
            sku: remote.sku.clone(),
            price: remote.price,
            currency_code: remote.currency_code.clone(),
            inventory_count: remote.total_inventory(),
            tags: remote.tags.clone(),
            status: ProductStatus::Pending,
        };
        let created = self.store.insert_local_product(&product).await?;
        Ok(CreateOutcome::Created(created))
    }

    /// Steps 5 and 6, run concurrently.
    async fn link_and_attach_images(
        &self,
        stored: &StoredCatalogItem,
        product: &LocalProduct,
        remote: &RemoteCatalogItem,
    ) -> Result<(), StoreError> {
        let link = self.store.mark_stored_item_imported(stored.id, product.id);
        let images = async {
            if remote.has_images() {
                try_join_all(remote.images.iter().enumerate().map(|(index, url)| {
                    let position = i32::try_from(index).unwrap_or(i32::MAX);
                    self.store.insert_product_image(product.id, url, position)
                }))
                .await?;
            }
            Ok::<(), StoreError>(())
        };

        futures::try_join!(link, images)?;
        Ok(())
    }

    async fn delete_product_best_effort(&self, product: &LocalProduct) {
        if let Err(err) = self.store.delete_local_product(product.id).await {
            tracing::error!(
                product_id = product.id,
                error = %err,
                "failed to delete product during import rollback"
            );
        }
    }

    /// An item imported by an earlier run keeps its `imported` status.
    async fn mark_failed_best_effort(&self, stored: &StoredCatalogItem) {
        if stored.is_imported() {
            return;
        }
        if let Err(err) = self.store.mark_stored_item_failed(stored.id).await {
            tracing::error!(
                stored_item_id = stored.id,
                error = %err,
                "failed to mark stored item as failed"
            );
        }
    }
}

enum CreateOutcome {
    Existing(LocalProduct),
    Created(LocalProduct),
}

/// Slug for the product created from `remote`: the slugified title, or
/// `item-<external_id>` when the title has no word characters.
#[must_use]
pub fn product_slug(remote: &RemoteCatalogItem) -> String {
    let slug = slugify(&remote.title);
    if !slug.is_empty() {
        return slug;
    }
    let id_slug = slugify(&remote.external_id);
    if id_slug.is_empty() {
        "item".to_owned()
    } else {
        format!("item-{id_slug}")
    }
}
