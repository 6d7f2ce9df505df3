//! Batch orchestrator.
//!
//! Runs one round at a time:
//!
//! 1. capture every `pending` job as a batch (all move to `processing`);
//! 2. ensure the shared backdrop exists, once for the whole batch;
//! 3. if that fails, fail every job in the batch with the same message
//!    and skip per-job calls entirely;
//! 4. otherwise process every job concurrently, each on its own task;
//! 5. wait for all of them, then record each outcome in the registry.
//!
//! [`Orchestrator::run`] repeats this whenever the registry changes, until
//! cancelled. Cancellation is only observed between rounds.

use std::sync::Arc;

use backdrop_core::asset::{AssetRef, GeneratedAsset};
use backdrop_core::job::{Job, JobOutcome};
use backdrop_core::types::JobId;
use backdrop_events::PipelineEventKind;
use backdrop_genai::{with_retry, GenerationService};
use futures::future::join_all;
use tokio_util::sync::CancellationToken;

use crate::collaborators::{AssetStore, Canonicalizer};
use crate::error::PipelineError;
use crate::registry::{Batch, JobRegistry};
use crate::shared::SharedResourceCache;

// ---------------------------------------------------------------------------
// JobProcessor
// ---------------------------------------------------------------------------

/// Everything one job needs: canonicalize, generate, store.
pub struct JobProcessor {
    service: Arc<dyn GenerationService>,
    canonicalizer: Arc<dyn Canonicalizer>,
    store: Arc<dyn AssetStore>,
    instructions: String,
}

impl JobProcessor {
    pub fn new(
        service: Arc<dyn GenerationService>,
        canonicalizer: Arc<dyn Canonicalizer>,
        store: Arc<dyn AssetStore>,
        instructions: impl Into<String>,
    ) -> Self {
        Self {
            service,
            canonicalizer,
            store,
            instructions: instructions.into(),
        }
    }

    /// Produce and store the output for one job.
    pub async fn process(
        &self,
        job: &Job,
        backdrop: &GeneratedAsset,
    ) -> Result<AssetRef, PipelineError> {
        let canonical = self.canonicalizer.canonicalize(&job.input, job.mode).await?;

        let inputs = [canonical, backdrop.clone()];
        let operation = format!("Generation for {}", job.name);
        let generated = with_retry(&operation, || {
            self.service.generate(&inputs, &self.instructions)
        })
        .await?;

        Ok(self.store.store(job, &generated).await?)
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Result of one round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundSummary {
    pub batch: u64,
    pub done: usize,
    pub failed: usize,
}

impl RoundSummary {
    pub fn total(&self) -> usize {
        self.done + self.failed
    }
}

pub struct Orchestrator {
    registry: Arc<JobRegistry>,
    cache: Arc<SharedResourceCache>,
    processor: Arc<JobProcessor>,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<JobRegistry>,
        cache: Arc<SharedResourceCache>,
        processor: JobProcessor,
    ) -> Self {
        Self {
            registry,
            cache,
            processor: Arc::new(processor),
        }
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<SharedResourceCache> {
        &self.cache
    }

    /// Process batches whenever pending work exists, until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut changes = self.registry.subscribe();
        tracing::info!("Orchestrator started");

        loop {
            // Mark seen before checking so a submission racing the check
            // still wakes the wait below.
            let _ = changes.borrow_and_update();
            if cancel.is_cancelled() {
                break;
            }
            if self.run_once().await.is_some() {
                continue;
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                changed = changes.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Orchestrator stopped");
    }

    /// Run a single round if pending work exists and no batch is active.
    pub async fn run_once(&self) -> Option<RoundSummary> {
        let batch = self.registry.begin_batch().await?;
        let summary = self.run_round(&batch).await;
        self.registry.finish_batch(batch.number()).await;
        Some(summary)
    }

    async fn run_round(&self, batch: &Batch) -> RoundSummary {
        let number = batch.number();
        tracing::info!(batch = number, size = batch.len(), "Batch started");
        self.registry.events().publish(PipelineEventKind::BatchStarted {
            batch: number,
            job_ids: batch.ids(),
        });

        let outcomes = match self.cache.ensure().await {
            Ok(backdrop) => self.fan_out(batch, backdrop).await,
            Err(e) => {
                let message = e.to_string();
                tracing::error!(
                    batch = number,
                    error = %message,
                    "Shared backdrop unavailable, failing whole batch",
                );
                batch
                    .jobs()
                    .iter()
                    .map(|job| (job.id, JobOutcome::Failed(message.clone())))
                    .collect()
            }
        };

        let mut summary = RoundSummary {
            batch: number,
            done: 0,
            failed: 0,
        };
        for (job_id, outcome) in outcomes {
            match &outcome {
                JobOutcome::Done(_) => summary.done += 1,
                JobOutcome::Failed(_) => summary.failed += 1,
            }
            self.record(number, job_id, outcome).await;
        }

        tracing::info!(
            batch = number,
            done = summary.done,
            failed = summary.failed,
            "Batch finished",
        );
        self.registry.events().publish(PipelineEventKind::BatchFinished {
            batch: number,
            done: summary.done,
            failed: summary.failed,
        });
        summary
    }

    /// Spawn one task per job and wait for every one to settle.
    async fn fan_out(
        &self,
        batch: &Batch,
        backdrop: Arc<GeneratedAsset>,
    ) -> Vec<(JobId, JobOutcome)> {
        let (ids, handles): (Vec<JobId>, Vec<_>) = batch
            .jobs()
            .iter()
            .map(|job| {
                let processor = Arc::clone(&self.processor);
                let backdrop = Arc::clone(&backdrop);
                let job = job.clone();
                let job_id = job.id;
                let handle = tokio::spawn(async move { processor.process(&job, &backdrop).await });
                (job_id, handle)
            })
            .unzip();

        let joined = join_all(handles).await;

        ids.into_iter()
            .zip(joined)
            .map(|(job_id, result)| {
                let outcome = match result {
                    Ok(Ok(output)) => JobOutcome::Done(output),
                    Ok(Err(e)) => JobOutcome::Failed(e.to_string()),
                    Err(join_err) => {
                        let error = PipelineError::TaskFailed(join_err.to_string());
                        JobOutcome::Failed(error.to_string())
                    }
                };
                (job_id, outcome)
            })
            .collect()
    }

    async fn record(&self, batch: u64, job_id: JobId, outcome: JobOutcome) {
        let event = match &outcome {
            JobOutcome::Done(output) => {
                tracing::info!(batch, %job_id, output = %output, "Job done");
                PipelineEventKind::JobCompleted { batch, job_id }
            }
            JobOutcome::Failed(error) => {
                tracing::warn!(batch, %job_id, error = %error, "Job failed");
                PipelineEventKind::JobFailed {
                    batch,
                    job_id,
                    error: error.clone(),
                }
            }
        };

        match self.registry.settle(job_id, outcome).await {
            Ok(true) => self.registry.events().publish(event),
            Ok(false) => {}
            Err(e) => tracing::error!(batch, %job_id, error = %e, "Could not record job outcome"),
        }
    }
}
