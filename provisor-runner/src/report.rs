//! Batch report
//!
//! Serializable summary of a finished batch. Failed units list every remote id
//! they obtained, so the cleanup CLI (or a person) can remove what was left
//! behind.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::scheduler::BatchReport;

#[derive(Debug, Serialize)]
pub struct BatchSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<FailureEntry>,
}

#[derive(Debug, Serialize)]
pub struct FailureEntry {
    pub index: u64,
    pub name: String,
    pub state: String,
    pub cause: String,
    pub application_id: Option<String>,
    pub plan_id: Option<String>,
    pub subscription_id: Option<String>,
}

impl BatchSummary {
    pub fn new(run_id: Uuid, started_at: DateTime<Utc>, report: &BatchReport) -> Self {
        let failures = report
            .failures()
            .map(|failure| FailureEntry {
                index: failure.unit.index,
                name: failure.unit.name.clone(),
                state: failure.state.to_string(),
                cause: failure.cause.to_string(),
                application_id: failure.unit.application_id.clone(),
                plan_id: failure.unit.plan_id.clone(),
                subscription_id: failure.unit.subscription_id.clone(),
            })
            .collect();

        Self {
            run_id,
            started_at,
            finished_at: Utc::now(),
            total: report.outcomes.len(),
            succeeded: report.succeeded(),
            failed: report.failed(),
            failures,
        }
    }

    /// Write the summary as pretty JSON
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).context("Failed to serialize batch report")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write batch report to {}", path.display()))
    }
}
