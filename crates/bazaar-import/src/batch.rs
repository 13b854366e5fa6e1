//! Batch import with job tracking.

use bazaar_core::{CatalogStore, ImportJob, JobStatus, LocalProduct, Notice, RemoteCatalogItem};
use chrono::Utc;
use futures::future::join_all;

use crate::error::ImportError;
use crate::importer::Importer;

/// Outcome of [`Importer::import_batch`].
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// Final job state, as tracked in memory. The persisted copy may lag if
    /// a snapshot write failed.
    pub job: ImportJob,
    /// Products for the items that imported, in input order.
    pub products: Vec<LocalProduct>,
    pub failures: Vec<ItemFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub external_id: String,
    pub error: String,
}

impl<S: CatalogStore> Importer<S> {
    /// Imports `items` in chunks under a single [`ImportJob`].
    ///
    /// Each chunk is imported concurrently and every item in it is allowed to
    /// settle; one item's failure never cancels its siblings. After each chunk
    /// the job counters advance and the snapshot is persisted. A failed
    /// snapshot write is logged and the batch carries on.
    ///
    /// The job ends `completed`, or `failed` when no item imported. A summary
    /// notice goes to the notifier either way.
    ///
    /// # Errors
    ///
    /// - [`ImportError::EmptyBatch`] if `items` is empty; nothing is written.
    /// - [`ImportError::BatchTooLarge`] if the item count does not fit a job.
    /// - [`ImportError::Store`] if the job row cannot be created.
    pub async fn import_batch(&self, items: &[RemoteCatalogItem]) -> Result<BatchReport, ImportError> {
        if items.is_empty() {
            return Err(ImportError::EmptyBatch);
        }
        let total =
            i32::try_from(items.len()).map_err(|_| ImportError::BatchTooLarge { len: items.len() })?;

        let mut job = self.store.create_import_job(total).await?;
        let chunk_size = self.settings.chunk_size.max(1);
        tracing::info!(
            job_id = job.id,
            public_id = %job.public_id,
            total,
            chunk_size,
            "import job started"
        );

        let mut products = Vec::with_capacity(items.len());
        let mut failures = Vec::new();

        for (chunk_index, chunk) in items.chunks(chunk_size).enumerate() {
            let outcomes = join_all(chunk.iter().map(|item| self.import_item(item))).await;

            let mut succeeded = 0i32;
            let mut failed = 0i32;
            for (item, outcome) in chunk.iter().zip(outcomes) {
                match outcome {
                    Ok(product) => {
                        succeeded += 1;
                        products.push(product);
                    }
                    Err(err) => {
                        failed += 1;
                        tracing::warn!(
                            job_id = job.id,
                            external_id = %item.external_id,
                            error = %err,
                            "item import failed"
                        );
                        failures.push(ItemFailure {
                            external_id: item.external_id.clone(),
                            error: err.to_string(),
                        });
                    }
                }
            }

            job.record_chunk(succeeded, failed, Utc::now());
            self.persist_job_best_effort(&job).await;
            tracing::info!(
                job_id = job.id,
                chunk = chunk_index + 1,
                processed = job.processed,
                total = job.total,
                succeeded = job.succeeded,
                failed = job.failed,
                "import chunk finished"
            );
        }

        self.notifier.notify(summary_notice(&job));
        tracing::info!(
            job_id = job.id,
            status = %job.status,
            succeeded = job.succeeded,
            failed = job.failed,
            "import job finished"
        );

        Ok(BatchReport {
            job,
            products,
            failures,
        })
    }

    async fn persist_job_best_effort(&self, job: &ImportJob) {
        if let Err(err) = self.store.update_import_job(job).await {
            tracing::error!(
                job_id = job.id,
                processed = job.processed,
                error = %err,
                "failed to persist import job progress"
            );
        }
    }
}

fn summary_notice(job: &ImportJob) -> Notice {
    if job.status == JobStatus::Failed {
        Notice::error(
            "Import failed",
            format!("All {} items failed to import.", job.total),
        )
    } else if job.failed > 0 {
        Notice::warning(
            "Import finished with errors",
            format!(
                "Imported {} of {} items; {} failed.",
                job.succeeded, job.total, job.failed
            ),
        )
    } else {
        Notice::success(
            "Import complete",
            format!("Imported {} items.", job.succeeded),
        )
    }
}
