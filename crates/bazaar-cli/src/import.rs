//! Import command handlers for the CLI.
//!
//! Items are fetched from the fulfillment provider first; the database is
//! only touched once there is something to import. `--dry-run` runs the same
//! pipeline against an in-memory store and discards the result.

use std::sync::Arc;
use std::time::Duration;

use bazaar_core::{AppConfig, CatalogStore, JobStatus, RemoteCatalogItem, TracingNotifier};
use bazaar_db::{MemoryCatalogStore, PgCatalogStore};
use bazaar_fulfillment::{CatalogFilters, ClientConfig, FulfillmentClient, ResponseCache};
use bazaar_import::{ImportSettings, Importer};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};

/// Sub-commands available under `import`.
#[derive(Debug, Subcommand)]
pub enum ImportCommands {
    /// Fetch a single item by its provider id and import it
    Item {
        /// Provider-side product id
        external_id: String,

        /// Run the import against an in-memory store; `DATABASE_URL` is not needed
        #[arg(long)]
        dry_run: bool,
    },
    /// Import every item matching the filters as one tracked job
    Batch {
        #[command(flatten)]
        filters: FilterArgs,

        /// Walk every page from `--page` onward instead of importing one page
        #[arg(long)]
        all_pages: bool,

        /// Run the import against an in-memory store; `DATABASE_URL` is not needed
        #[arg(long)]
        dry_run: bool,
    },
}

/// Listing filters forwarded to the fulfillment provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Args)]
pub struct FilterArgs {
    /// Free-text search over titles and descriptions
    #[arg(long)]
    pub search: Option<String>,

    #[arg(long)]
    pub category: Option<String>,

    #[arg(long)]
    pub tag: Option<String>,

    #[arg(long)]
    pub sku: Option<String>,

    /// Only items with inventory on hand
    #[arg(long)]
    pub in_stock: bool,

    /// Only items changed at or after this RFC 3339 timestamp
    #[arg(long)]
    pub updated_since: Option<DateTime<Utc>>,

    /// 1-based page to start from
    #[arg(long)]
    pub page: Option<u32>,

    /// Page size
    #[arg(long)]
    pub limit: Option<u32>,
}

impl FilterArgs {
    pub(crate) fn to_filters(&self) -> CatalogFilters {
        CatalogFilters {
            page: self.page,
            limit: self.limit,
            search: self.search.clone(),
            category: self.category.clone(),
            tag: self.tag.clone(),
            sku: self.sku.clone(),
            in_stock: self.in_stock.then_some(true),
            updated_since: self.updated_since,
        }
    }
}

pub(crate) async fn run_import(config: &AppConfig, command: ImportCommands) -> anyhow::Result<()> {
    let client = build_client(config)?;
    let settings = ImportSettings::from_app_config(config);

    match command {
        ImportCommands::Item {
            external_id,
            dry_run,
        } => {
            if dry_run {
                let importer = dry_run_importer(settings);
                run_import_item(&importer, &client, &external_id, true).await
            } else {
                let pool = crate::connect(config).await?;
                let importer = database_importer(pool.clone(), settings);
                let result = run_import_item(&importer, &client, &external_id, false).await;
                pool.close().await;
                result
            }
        }
        ImportCommands::Batch {
            filters,
            all_pages,
            dry_run,
        } => {
            let items = fetch_items(
                &client,
                &filters.to_filters(),
                all_pages,
                config.fulfillment_page_delay_ms,
            )
            .await?;
            if items.is_empty() {
                println!("no catalog items matched the filters; skipping job creation");
                return Ok(());
            }

            if dry_run {
                let importer = dry_run_importer(settings);
                run_import_batch(&importer, &items, true).await
            } else {
                let pool = crate::connect(config).await?;
                let importer = database_importer(pool.clone(), settings);
                let result = run_import_batch(&importer, &items, false).await;
                pool.close().await;
                result
            }
        }
    }
}

fn build_client(config: &AppConfig) -> anyhow::Result<FulfillmentClient> {
    let cache = Arc::new(ResponseCache::new(Duration::from_secs(config.cache_ttl_secs)));
    let client = FulfillmentClient::new(ClientConfig::from_app_config(config), cache)?;
    Ok(client)
}

fn dry_run_importer(settings: ImportSettings) -> Importer<MemoryCatalogStore> {
    Importer::new(
        Arc::new(MemoryCatalogStore::new()),
        Arc::new(TracingNotifier),
        settings,
    )
}

fn database_importer(pool: sqlx::PgPool, settings: ImportSettings) -> Importer<PgCatalogStore> {
    Importer::new(
        Arc::new(PgCatalogStore::new(pool)),
        Arc::new(TracingNotifier),
        settings,
    )
}

async fn fetch_items(
    client: &FulfillmentClient,
    filters: &CatalogFilters,
    all_pages: bool,
    page_delay_ms: u64,
) -> anyhow::Result<Vec<RemoteCatalogItem>> {
    if all_pages {
        let items = client.fetch_all(filters, page_delay_ms).await?;
        tracing::info!(items = items.len(), "fetched every catalog page");
        return Ok(items);
    }

    let page = client.fetch_page(filters).await?;
    tracing::info!(
        items = page.items.len(),
        page = page.page,
        total_pages = page.total_pages,
        "fetched catalog page"
    );
    if page.has_next_page() {
        println!(
            "note: page {} of {}; pass --all-pages to import the rest",
            page.page, page.total_pages
        );
    }
    Ok(page.items)
}

async fn run_import_item<S: CatalogStore>(
    importer: &Importer<S>,
    client: &FulfillmentClient,
    external_id: &str,
    dry_run: bool,
) -> anyhow::Result<()> {
    let product = importer.fetch_and_import(client, external_id).await?;
    let prefix = if dry_run { "dry-run: " } else { "" };
    println!(
        "{prefix}imported {external_id} as product {} (slug: {}, status: {})",
        product.id, product.slug, product.status
    );
    Ok(())
}

async fn run_import_batch<S: CatalogStore>(
    importer: &Importer<S>,
    items: &[RemoteCatalogItem],
    dry_run: bool,
) -> anyhow::Result<()> {
    let report = importer.import_batch(items).await?;
    let job = &report.job;

    let prefix = if dry_run { "dry-run: " } else { "" };
    println!(
        "{prefix}job {} ({}) {}: {} of {} imported, {} failed",
        job.id, job.public_id, job.status, job.succeeded, job.total, job.failed
    );
    for failure in &report.failures {
        println!("  {:<24}{}", failure.external_id, failure.error);
    }

    if job.status == JobStatus::Failed {
        anyhow::bail!("all {} items failed to import", job.total);
    }
    Ok(())
}
