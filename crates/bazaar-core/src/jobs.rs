//! Progress tracking for bulk imports.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ParseStatusError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(ParseStatusError {
                kind: "job",
                value: other.to_string(),
            }),
        }
    }
}

/// One bulk-import invocation.
///
/// Counters only move forward through [`ImportJob::record_chunk`], which keeps
/// `processed == succeeded + failed` and `processed <= total`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportJob {
    pub id: i64,
    pub public_id: Uuid,
    pub total: i32,
    pub processed: i32,
    pub succeeded: i32,
    pub failed: i32,
    pub status: JobStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ImportJob {
    /// Folds one finished chunk into the running counts.
    ///
    /// Outcomes beyond `total` are clamped so the counters can never overrun.
    /// Once every item is accounted for the job becomes terminal: `Completed`,
    /// or `Failed` when no item succeeded.
    pub fn record_chunk(&mut self, succeeded: i32, failed: i32, now: DateTime<Utc>) {
        let remaining = self.remaining();
        let succeeded = succeeded.max(0).min(remaining);
        let failed = failed.max(0).min(remaining - succeeded);

        self.succeeded += succeeded;
        self.failed += failed;
        self.processed = self.succeeded + self.failed;

        if self.processed == self.total {
            self.status = if self.succeeded == 0 && self.total > 0 {
                JobStatus::Failed
            } else {
                JobStatus::Completed
            };
            if self.status == JobStatus::Failed && self.error_message.is_none() {
                self.error_message = Some(format!("all {} items failed to import", self.total));
            }
            self.completed_at = Some(now);
        }
    }

    #[must_use]
    pub fn remaining(&self) -> i32 {
        (self.total - self.processed).max(0)
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    /// Fraction of items processed, in `0.0..=1.0`.
    #[must_use]
    pub fn progress(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        f64::from(self.processed) / f64::from(self.total)
    }
}
