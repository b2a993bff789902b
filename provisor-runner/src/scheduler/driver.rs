//! Batch driver
//!
//! Runs a range of pipeline units over a bounded pool of worker tasks.
//! Workers pull unit indices from a shared cursor; each unit runs in its own
//! task and reports its outcome over a channel, so one failing or panicking
//! unit never stops the others.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use provisor_client::ClientError;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::service::pipeline::UnitIds;
use crate::service::{Pipeline, PipelineFailure, RunOutcome};

/// Upper bound on outcome slots reserved before the batch runs
const OUTCOME_PREALLOC: u64 = 4096;

/// Errors that stop a batch before any unit runs
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("failed to resolve the shared plan: {0}")]
    Plan(#[source] ClientError),

    #[error("invalid batch: {0}")]
    InvalidBatch(String),
}

/// Completed-unit counters, readable while a batch runs
#[derive(Debug, Default)]
pub struct Progress {
    total: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

impl Progress {
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Units finished so far; never decreases during a batch
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    fn start(&self, total: u64) {
        self.total.store(total, Ordering::Relaxed);
        self.completed.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
    }

    fn record(&self, outcome: &RunOutcome) -> u64 {
        if !outcome.is_done() {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        self.completed.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Outcomes of one batch, ordered by unit index
#[derive(Debug)]
pub struct BatchReport {
    pub outcomes: Vec<RunOutcome>,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_done()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn failures(&self) -> impl Iterator<Item = &PipelineFailure> {
        self.outcomes.iter().filter_map(RunOutcome::failure)
    }
}

/// Dispatches pipeline units over a bounded worker pool
pub struct BatchDriver {
    pipeline: Pipeline,
    progress: Arc<Progress>,
}

impl BatchDriver {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            progress: Arc::new(Progress::default()),
        }
    }

    /// Handle on the progress counters, for external display
    pub fn progress(&self) -> Arc<Progress> {
        Arc::clone(&self.progress)
    }

    /// Run units `start_index .. start_index + count` with at most
    /// `concurrency` in flight
    ///
    /// # Errors
    /// Only for problems that prevent the batch from starting: an invalid
    /// range, or a shared plan that cannot be resolved. Unit failures are
    /// reported in the returned outcomes.
    pub async fn run_batch(
        &self,
        start_index: u64,
        count: u64,
        concurrency: usize,
    ) -> Result<BatchReport, DriverError> {
        if concurrency == 0 {
            return Err(DriverError::InvalidBatch(
                "concurrency must be greater than 0".to_string(),
            ));
        }
        if start_index.checked_add(count).is_none() {
            return Err(DriverError::InvalidBatch(format!(
                "{} + {} overflows",
                start_index, count
            )));
        }

        let started = Instant::now();
        let pipeline = self.prepare_pipeline().await?;
        self.progress.start(count);

        info!(
            "Starting batch of {} unit(s) from index {} with concurrency {}",
            count, start_index, concurrency
        );

        // Offset of the next unit; stops at `count` and never wraps
        let cursor = Arc::new(AtomicU64::new(0));
        let in_progress = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut workers = JoinSet::new();

        let worker_count = (concurrency as u64).min(count) as usize;
        for _ in 0..worker_count {
            let cursor = Arc::clone(&cursor);
            let in_progress = Arc::clone(&in_progress);
            let pipeline = pipeline.clone();
            let tx = tx.clone();

            workers.spawn(async move {
                loop {
                    let Ok(offset) = cursor.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |next| {
                        (next < count).then_some(next + 1)
                    }) else {
                        break;
                    };
                    let index = start_index + offset;

                    in_progress.fetch_add(1, Ordering::SeqCst);
                    let outcome = Self::run_unit(&pipeline, index).await;
                    in_progress.fetch_sub(1, Ordering::SeqCst);

                    if tx.send(outcome).is_err() {
                        break;
                    }
                }
            });
        }
        drop(tx);

        let log_every = (count / 20).max(1);
        let mut outcomes = Vec::with_capacity(count.min(OUTCOME_PREALLOC) as usize);
        while let Some(outcome) = rx.recv().await {
            let completed = self.progress.record(&outcome);
            if completed % log_every == 0 || completed == count {
                info!(
                    "Progress: {}/{} unit(s) done, {} failed, {} in flight",
                    completed,
                    count,
                    self.progress.failed(),
                    in_progress.load(Ordering::SeqCst)
                );
            }
            outcomes.push(outcome);
        }

        while let Some(result) = workers.join_next().await {
            if let Err(e) = result {
                warn!("Worker task panicked: {}", e);
            }
        }

        outcomes.sort_by_key(RunOutcome::index);
        let report = BatchReport {
            outcomes,
            elapsed: started.elapsed(),
        };

        info!(
            "Batch finished in {:?}: {} succeeded, {} failed",
            report.elapsed,
            report.succeeded(),
            report.failed()
        );

        Ok(report)
    }

    /// Bind the shared plan once if the strategy asks for it
    async fn prepare_pipeline(&self) -> Result<Pipeline, DriverError> {
        if !self.pipeline.needs_shared_plan() {
            return Ok(self.pipeline.clone());
        }

        let plan = self
            .pipeline
            .resolve_shared_plan()
            .await
            .map_err(DriverError::Plan)?;
        info!("Using shared plan {} ({})", plan.name, plan.id);

        Ok(self.pipeline.clone().with_shared_plan(plan))
    }

    /// Run one unit in its own task so a panic becomes an outcome
    async fn run_unit(pipeline: &Pipeline, index: u64) -> RunOutcome {
        let unit_pipeline = pipeline.clone();
        match tokio::spawn(async move { unit_pipeline.run(index).await }).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Unit {} task failed: {}", index, e);
                let spec = pipeline.application_spec(index);
                RunOutcome::aborted(
                    UnitIds {
                        index,
                        name: spec.name,
                        ..Default::default()
                    },
                    e.to_string(),
                )
            }
        }
    }
}
