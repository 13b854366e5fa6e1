//! Read-only views over bulk import jobs.

use bazaar_core::{AppConfig, CatalogStore, ImportJob};
use bazaar_db::PgCatalogStore;
use chrono::{DateTime, Utc};
use clap::Subcommand;

/// Sub-commands available under `jobs`.
#[derive(Debug, Subcommand)]
pub enum JobsCommands {
    /// List recent import jobs, newest first
    List {
        /// Maximum number of jobs to show
        #[arg(long, default_value = "20")]
        limit: u32,
    },
    /// Show one import job
    Show {
        /// Job id as printed by `jobs list`
        id: i64,
    },
}

pub(crate) async fn run_jobs(config: &AppConfig, command: JobsCommands) -> anyhow::Result<()> {
    let pool = crate::connect(config).await?;
    let store = PgCatalogStore::new(pool.clone());

    let result = match command {
        JobsCommands::List { limit } => list_jobs(&store, i64::from(limit)).await,
        JobsCommands::Show { id } => show_job(&store, id).await,
    };
    pool.close().await;
    result
}

async fn list_jobs<S: CatalogStore>(store: &S, limit: i64) -> anyhow::Result<()> {
    let jobs = store.list_import_jobs(limit).await?;
    if jobs.is_empty() {
        println!("no import jobs found; run `import batch` first");
        return Ok(());
    }

    println!(
        "{:<8}{:<12}{:<10}{:<10}{:<10}STARTED",
        "ID", "STATUS", "PROCESSED", "SUCCEEDED", "FAILED"
    );
    for job in &jobs {
        println!(
            "{:<8}{:<12}{:<10}{:<10}{:<10}{}",
            job.id,
            job.status.as_str(),
            format!("{}/{}", job.processed, job.total),
            job.succeeded,
            job.failed,
            fmt_time(job.started_at)
        );
    }
    Ok(())
}

async fn show_job<S: CatalogStore>(store: &S, id: i64) -> anyhow::Result<()> {
    let job = store
        .get_import_job(id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("import job {id} not found"))?;
    print!("{}", describe_job(&job));
    Ok(())
}

pub(crate) fn describe_job(job: &ImportJob) -> String {
    let mut out = String::new();
    out.push_str(&format!("Job:       {} ({})\n", job.id, job.public_id));
    out.push_str(&format!("Status:    {}\n", job.status));
    out.push_str(&format!(
        "Progress:  {}/{} ({:.0}%)\n",
        job.processed,
        job.total,
        job.progress() * 100.0
    ));
    out.push_str(&format!("Succeeded: {}\n", job.succeeded));
    out.push_str(&format!("Failed:    {}\n", job.failed));
    out.push_str(&format!("Started:   {}\n", fmt_time(job.started_at)));
    out.push_str(&format!("Completed: {}\n", fmt_time(job.completed_at)));
    if let Some(message) = &job.error_message {
        out.push_str(&format!("Error:     {message}\n"));
    }
    out
}

/// Format an optional timestamp for display, returning `"-"` when `None`.
fn fmt_time(at: Option<DateTime<Utc>>) -> String {
    at.map_or_else(|| "-".to_owned(), |t| t.format("%Y-%m-%d %H:%M:%S").to_string())
}
