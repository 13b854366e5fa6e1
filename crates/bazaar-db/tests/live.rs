//! Live integration tests for bazaar-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/bazaar-db/`), so `"../../migrations"` resolves to the workspace
//! migration directory.
//!
//! Ignored by default; run with `DATABASE_URL` set and `--ignored`.

use std::collections::BTreeMap;

use bazaar_core::{
    CatalogStore, ImportStatus, JobStatus, NewLocalProduct, ProductStatus, RemoteCatalogItem,
    RemoteVariant, StoreError,
};
use bazaar_db::PgCatalogStore;
use chrono::Utc;
use rust_decimal::Decimal;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn remote_item(external_id: &str, title: &str) -> RemoteCatalogItem {
    RemoteCatalogItem {
        external_id: external_id.to_string(),
        title: title.to_string(),
        description: Some("A sturdy everyday tote.".to_string()),
        sku: Some("TOTE-1".to_string()),
        price: Decimal::new(2400, 2),
        currency_code: "USD".to_string(),
        inventory_count: 8,
        images: vec!["https://cdn.test/tote.jpg".to_string()],
        variants: vec![],
        tags: vec!["canvas".to_string()],
        categories: vec!["bags".to_string()],
        vendor: Some("Loom & Co".to_string()),
        updated_at: None,
    }
}

fn new_product(stored_item_id: i64) -> NewLocalProduct {
    NewLocalProduct {
        vendor_id: None,
        stored_item_id,
        name: "Canvas Tote".to_string(),
        slug: "canvas-tote".to_string(),
        description: None,
        sku: Some("TOTE-1".to_string()),
        price: Decimal::new(2400, 2),
        currency_code: "USD".to_string(),
        inventory_count: 8,
        tags: vec![],
        status: ProductStatus::Pending,
    }
}

// ---------------------------------------------------------------------------
// stored_catalog_items
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn upsert_same_external_id_yields_one_row(pool: sqlx::PgPool) {
    let store = PgCatalogStore::new(pool);

    let first = store
        .upsert_stored_item(&remote_item("ext-1", "Canvas Tote"))
        .await
        .unwrap();
    let second = store
        .upsert_stored_item(&remote_item("ext-1", "Canvas Tote (2026)"))
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.title, "Canvas Tote (2026)");
    assert_eq!(second.import_status, ImportStatus::Pending);
    assert_eq!(store.count_stored_items().await.unwrap(), 1);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn variant_upsert_updates_in_place(pool: sqlx::PgPool) {
    let store = PgCatalogStore::new(pool);
    let stored = store
        .upsert_stored_item(&remote_item("ext-1", "Tee"))
        .await
        .unwrap();

    let mut variant = RemoteVariant {
        external_id: "v-1".to_string(),
        title: "Medium".to_string(),
        sku: None,
        price: Decimal::new(1999, 2),
        inventory_count: 3,
        options: BTreeMap::from([("size".to_string(), "M".to_string())]),
    };
    store.upsert_stored_variant(stored.id, &variant).await.unwrap();
    variant.price = Decimal::new(1799, 2);
    let updated = store.upsert_stored_variant(stored.id, &variant).await.unwrap();

    let variants = store.list_stored_variants(stored.id).await.unwrap();
    assert_eq!(variants.len(), 1);
    assert_eq!(updated.price, Decimal::new(1799, 2));
    assert_eq!(variants[0].options.get("size").map(String::as_str), Some("M"));
}

// ---------------------------------------------------------------------------
// local_products / product_images
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn link_then_delete_product_unlinks_mirror(pool: sqlx::PgPool) {
    let store = PgCatalogStore::new(pool);
    let stored = store
        .upsert_stored_item(&remote_item("ext-1", "Canvas Tote"))
        .await
        .unwrap();
    let product = store.insert_local_product(&new_product(stored.id)).await.unwrap();
    for (position, url) in ["https://cdn.test/a.jpg", "https://cdn.test/b.jpg"]
        .iter()
        .enumerate()
    {
        store
            .insert_product_image(product.id, url, i32::try_from(position).unwrap())
            .await
            .unwrap();
    }
    store
        .mark_stored_item_imported(stored.id, product.id)
        .await
        .unwrap();

    let linked = store.get_stored_item("ext-1").await.unwrap().unwrap();
    assert_eq!(linked.local_product_id, Some(product.id));
    assert!(linked.imported_at.is_some());
    assert_eq!(store.list_product_images(product.id).await.unwrap().len(), 2);

    store.delete_local_product(product.id).await.unwrap();
    let unlinked = store.get_stored_item("ext-1").await.unwrap().unwrap();
    assert_eq!(unlinked.local_product_id, None);
    assert!(store.list_product_images(product.id).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn duplicate_image_position_is_a_conflict(pool: sqlx::PgPool) {
    let store = PgCatalogStore::new(pool);
    let stored = store
        .upsert_stored_item(&remote_item("ext-1", "Canvas Tote"))
        .await
        .unwrap();
    let product = store.insert_local_product(&new_product(stored.id)).await.unwrap();

    store
        .insert_product_image(product.id, "https://cdn.test/a.jpg", 0)
        .await
        .unwrap();
    let err = store
        .insert_product_image(product.id, "https://cdn.test/b.jpg", 0)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)), "got: {err:?}");
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn product_for_unknown_mirror_row_is_a_constraint_error(pool: sqlx::PgPool) {
    let store = PgCatalogStore::new(pool);
    let err = store.insert_local_product(&new_product(999)).await.unwrap_err();
    assert!(matches!(err, StoreError::Constraint(_)), "got: {err:?}");
}

// ---------------------------------------------------------------------------
// import_jobs
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn import_job_snapshot_round_trip(pool: sqlx::PgPool) {
    let store = PgCatalogStore::new(pool);
    let mut job = store.create_import_job(7).await.unwrap();
    assert_eq!(job.status, JobStatus::Processing);
    assert!(job.started_at.is_some());

    job.record_chunk(4, 1, Utc::now());
    store.update_import_job(&job).await.unwrap();
    job.record_chunk(2, 0, Utc::now());
    store.update_import_job(&job).await.unwrap();

    let reloaded = store.get_import_job(job.id).await.unwrap().unwrap();
    assert_eq!(reloaded.processed, 7);
    assert_eq!(reloaded.succeeded, 6);
    assert_eq!(reloaded.failed, 1);
    assert_eq!(reloaded.status, JobStatus::Completed);
    assert!(reloaded.completed_at.is_some());

    let listed = store.list_import_jobs(10).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].public_id, job.public_id);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn inconsistent_job_counters_are_rejected(pool: sqlx::PgPool) {
    let store = PgCatalogStore::new(pool);
    let mut job = store.create_import_job(2).await.unwrap();
    job.processed = 3;
    job.succeeded = 3;
    let err = store.update_import_job(&job).await.unwrap_err();
    assert!(matches!(err, StoreError::Constraint(_)), "got: {err:?}");
}
