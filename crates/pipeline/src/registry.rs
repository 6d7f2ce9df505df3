//! In-memory job registry.
//!
//! [`JobRegistry`] owns every [`Job`] record for the process lifetime, in
//! submission order. Each mutation replaces whole records keyed by id and
//! bumps a revision counter published on a `watch` channel, which is how
//! the orchestrator learns that new work may exist.
//!
//! The registry also tracks whether a batch is in flight: only one batch
//! may be active at a time, and a reset is refused while one is.

use std::sync::Arc;

use backdrop_core::error::CoreError;
use backdrop_core::job::{Job, JobOutcome, JobStatus, NewJob};
use backdrop_core::types::JobId;
use backdrop_events::{EventBus, PipelineEventKind};
use indexmap::IndexMap;
use tokio::sync::{watch, RwLock};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

/// The jobs captured by one orchestration round.
///
/// Immutable: jobs submitted after capture never join it.
#[derive(Debug, Clone)]
pub struct Batch {
    number: u64,
    jobs: Vec<Job>,
}

impl Batch {
    /// Round number, starting at 1.
    pub fn number(&self) -> u64 {
        self.number
    }

    /// Job records as they were when the batch was captured.
    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn ids(&self) -> Vec<JobId> {
        self.jobs.iter().map(|j| j.id).collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

/// Number of jobs in each status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: usize,
    pub processing: usize,
    pub done: usize,
    pub error: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.pending + self.processing + self.done + self.error
    }

    /// `true` when no job is waiting or in flight.
    pub fn is_settled(&self) -> bool {
        self.pending == 0 && self.processing == 0
    }
}

// ---------------------------------------------------------------------------
// JobRegistry
// ---------------------------------------------------------------------------

#[derive(Default)]
struct RegistryState {
    jobs: IndexMap<JobId, Job>,
    active_batch: Option<u64>,
    batches_started: u64,
}

/// Owned store of job records.
pub struct JobRegistry {
    state: RwLock<RegistryState>,
    revision: watch::Sender<u64>,
    events: Arc<EventBus>,
}

impl JobRegistry {
    pub fn new(events: Arc<EventBus>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            state: RwLock::new(RegistryState::default()),
            revision,
            events,
        }
    }

    /// Bus that registry and orchestrator events are published on.
    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Receiver whose value changes on every registry mutation.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    // ---- submission ----

    /// Insert one job in `pending`.
    pub async fn submit(&self, request: NewJob) -> Result<JobId, CoreError> {
        self.submit_many(vec![request])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CoreError::Validation("No job was inserted".into()))
    }

    /// Insert several jobs in `pending`, all or none.
    ///
    /// Fails with [`CoreError::Conflict`] if any caller-supplied id is
    /// already registered or repeated within `requests`.
    pub async fn submit_many(&self, requests: Vec<NewJob>) -> Result<Vec<JobId>, CoreError> {
        let mut state = self.state.write().await;

        let mut prepared = IndexMap::with_capacity(requests.len());
        for request in requests {
            let id = request.id.unwrap_or_else(Uuid::now_v7);
            if state.jobs.contains_key(&id) || prepared.contains_key(&id) {
                return Err(CoreError::Conflict(format!("Job {id} is already registered")));
            }
            prepared.insert(id, Job::pending(id, request));
        }

        let ids: Vec<JobId> = prepared.keys().copied().collect();
        state.jobs.extend(prepared);
        drop(state);

        if !ids.is_empty() {
            self.bump();
        }
        for &job_id in &ids {
            tracing::debug!(%job_id, "Job submitted");
            self.events.publish(PipelineEventKind::JobSubmitted { job_id });
        }
        Ok(ids)
    }

    // ---- reads ----

    /// Every job in submission order.
    pub async fn snapshot(&self) -> Vec<Job> {
        self.state.read().await.jobs.values().cloned().collect()
    }

    pub async fn get(&self, id: JobId) -> Option<Job> {
        self.state.read().await.jobs.get(&id).cloned()
    }

    /// Jobs currently in `status`, in submission order.
    pub async fn with_status(&self, status: JobStatus) -> Vec<Job> {
        self.state
            .read()
            .await
            .jobs
            .values()
            .filter(|j| j.status == status)
            .cloned()
            .collect()
    }

    pub async fn counts(&self) -> StatusCounts {
        let state = self.state.read().await;
        let mut counts = StatusCounts::default();
        for job in state.jobs.values() {
            match job.status {
                JobStatus::Pending => counts.pending += 1,
                JobStatus::Processing => counts.processing += 1,
                JobStatus::Done => counts.done += 1,
                JobStatus::Error => counts.error += 1,
            }
        }
        counts
    }

    pub async fn is_batch_active(&self) -> bool {
        self.state.read().await.active_batch.is_some()
    }

    // ---- orchestrator-side mutations ----

    /// Capture every `pending` job as a new batch and move them all to
    /// `processing` under one lock.
    ///
    /// Returns `None` if a batch is already active or nothing is pending.
    pub async fn begin_batch(&self) -> Option<Batch> {
        let mut state = self.state.write().await;
        if state.active_batch.is_some() {
            return None;
        }

        let mut captured = Vec::new();
        for job in state.jobs.values_mut() {
            if job.status != JobStatus::Pending {
                continue;
            }
            match job.start() {
                Ok(started) => {
                    *job = started;
                    captured.push(job.clone());
                }
                Err(e) => tracing::error!(job_id = %job.id, error = %e, "Cannot start job"),
            }
        }
        if captured.is_empty() {
            return None;
        }

        state.batches_started += 1;
        let number = state.batches_started;
        state.active_batch = Some(number);
        drop(state);

        self.bump();
        Some(Batch {
            number,
            jobs: captured,
        })
    }

    /// Record a job's terminal outcome.
    ///
    /// Returns `Ok(false)` if the id is unknown (e.g. the registry was
    /// reset), or an error if the job is not in `processing`.
    pub async fn settle(&self, id: JobId, outcome: JobOutcome) -> Result<bool, CoreError> {
        let mut state = self.state.write().await;
        let Some(job) = state.jobs.get_mut(&id) else {
            tracing::warn!(job_id = %id, "Outcome for unknown job ignored");
            return Ok(false);
        };
        *job = job.settle(outcome)?;
        drop(state);

        self.bump();
        Ok(true)
    }

    /// Mark the given batch finished so the next one may start.
    pub async fn finish_batch(&self, number: u64) {
        let mut state = self.state.write().await;
        if state.active_batch == Some(number) {
            state.active_batch = None;
            drop(state);
            self.bump();
        } else {
            tracing::warn!(
                batch = number,
                active = ?state.active_batch,
                "Finish requested for a batch that is not active",
            );
        }
    }

    // ---- host-side mutations ----

    /// Remove every job. Refused while a batch is active.
    pub async fn reset(&self) -> Result<usize, CoreError> {
        let mut state = self.state.write().await;
        if let Some(batch) = state.active_batch {
            return Err(CoreError::Conflict(format!(
                "Cannot reset while batch {batch} is processing"
            )));
        }
        let removed = state.jobs.len();
        state.jobs.clear();
        drop(state);

        self.bump();
        tracing::info!(removed, "Job registry reset");
        self.events.publish(PipelineEventKind::RegistryReset { removed });
        Ok(removed)
    }

    /// Resolve once no job is `pending` or `processing` and no batch is
    /// active.
    pub async fn wait_until_settled(&self) {
        let mut changes = self.subscribe();
        loop {
            let _ = changes.borrow_and_update();
            if self.is_settled().await {
                return;
            }
            if changes.changed().await.is_err() {
                return;
            }
        }
    }

    async fn is_settled(&self) -> bool {
        let state = self.state.read().await;
        state.active_batch.is_none()
            && state
                .jobs
                .values()
                .all(|j| j.status.is_terminal())
    }

    fn bump(&self) {
        self.revision.send_modify(|r| *r = r.wrapping_add(1));
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new(Arc::new(EventBus::default()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use backdrop_core::asset::AssetRef;

    use super::*;

    fn job(name: &str) -> NewJob {
        NewJob::new(name, format!("uploads/{name}"))
    }

    #[tokio::test]
    async fn submitted_jobs_are_pending_in_order() {
        let registry = JobRegistry::default();
        let ids = registry
            .submit_many(vec![job("a.png"), job("b.png"), job("c.png")])
            .await
            .unwrap();

        let snapshot = registry.snapshot().await;
        assert_eq!(snapshot.iter().map(|j| j.id).collect::<Vec<_>>(), ids);
        assert!(snapshot.iter().all(|j| j.status == JobStatus::Pending));
        assert_eq!(registry.counts().await.pending, 3);
    }

    #[tokio::test]
    async fn duplicate_caller_id_is_rejected_atomically() {
        let registry = JobRegistry::default();
        let id = Uuid::now_v7();
        registry.submit(job("a.png").with_id(id)).await.unwrap();

        let result = registry
            .submit_many(vec![job("b.png"), job("c.png").with_id(id)])
            .await;

        assert_matches!(result, Err(CoreError::Conflict(_)));
        assert_eq!(registry.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn repeated_id_within_one_submission_is_rejected() {
        let registry = JobRegistry::default();
        let id = Uuid::now_v7();

        let result = registry
            .submit_many(vec![job("a.png").with_id(id), job("b.png").with_id(id)])
            .await;

        assert_matches!(result, Err(CoreError::Conflict(_)));
        assert!(registry.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn begin_batch_moves_all_pending_to_processing() {
        let registry = JobRegistry::default();
        let ids = registry
            .submit_many(vec![job("a.png"), job("b.png")])
            .await
            .unwrap();

        let batch = registry.begin_batch().await.expect("batch");
        assert_eq!(batch.number(), 1);
        assert_eq!(batch.ids(), ids);
        assert!(batch.jobs().iter().all(|j| j.status == JobStatus::Processing));
        assert_eq!(registry.counts().await.processing, 2);
        assert!(registry.is_batch_active().await);
    }

    #[tokio::test]
    async fn only_one_batch_at_a_time() {
        let registry = JobRegistry::default();
        registry.submit(job("a.png")).await.unwrap();
        let first = registry.begin_batch().await.expect("batch");

        let late = registry.submit(job("b.png")).await.unwrap();
        assert!(registry.begin_batch().await.is_none());
        assert_eq!(registry.get(late).await.unwrap().status, JobStatus::Pending);

        registry.finish_batch(first.number()).await;
        let second = registry.begin_batch().await.expect("second batch");
        assert_eq!(second.ids(), vec![late]);
        assert_eq!(second.number(), 2);
    }

    #[tokio::test]
    async fn no_batch_without_pending_work() {
        let registry = JobRegistry::default();
        assert!(registry.begin_batch().await.is_none());
        assert!(!registry.is_batch_active().await);
    }

    #[tokio::test]
    async fn settle_applies_terminal_outcomes() {
        let registry = JobRegistry::default();
        let ids = registry
            .submit_many(vec![job("a.png"), job("b.png")])
            .await
            .unwrap();
        registry.begin_batch().await.expect("batch");

        assert!(registry
            .settle(ids[0], JobOutcome::Done(AssetRef::new("out/a.png")))
            .await
            .unwrap());
        assert!(registry
            .settle(ids[1], JobOutcome::Failed("bad input".into()))
            .await
            .unwrap());

        let a = registry.get(ids[0]).await.unwrap();
        let b = registry.get(ids[1]).await.unwrap();
        assert_eq!(a.status, JobStatus::Done);
        assert_eq!(a.output, Some(AssetRef::new("out/a.png")));
        assert_eq!(b.status, JobStatus::Error);
        assert_eq!(b.error.as_deref(), Some("bad input"));
        assert_eq!(registry.with_status(JobStatus::Done).await.len(), 1);
    }

    #[tokio::test]
    async fn settle_unknown_id_is_noop() {
        let registry = JobRegistry::default();
        let settled = registry
            .settle(Uuid::now_v7(), JobOutcome::Failed("x".into()))
            .await
            .unwrap();
        assert!(!settled);
    }

    #[tokio::test]
    async fn settle_rejects_pending_job() {
        let registry = JobRegistry::default();
        let id = registry.submit(job("a.png")).await.unwrap();

        let result = registry.settle(id, JobOutcome::Failed("x".into())).await;
        assert_matches!(result, Err(CoreError::InvalidTransition { .. }));
        assert_eq!(registry.get(id).await.unwrap().status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn reset_refused_while_batch_active() {
        let registry = JobRegistry::default();
        registry.submit(job("a.png")).await.unwrap();
        let batch = registry.begin_batch().await.expect("batch");

        assert_matches!(registry.reset().await, Err(CoreError::Conflict(_)));

        registry.finish_batch(batch.number()).await;
        assert_eq!(registry.reset().await.unwrap(), 1);
        assert!(registry.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn snapshot_is_stable_without_activity() {
        let registry = JobRegistry::default();
        registry
            .submit_many(vec![job("a.png"), job("b.png")])
            .await
            .unwrap();

        assert_eq!(registry.snapshot().await, registry.snapshot().await);
    }

    #[tokio::test]
    async fn mutations_notify_subscribers() {
        let registry = JobRegistry::default();
        let mut changes = registry.subscribe();
        let _ = changes.borrow_and_update();

        registry.submit(job("a.png")).await.unwrap();

        assert!(changes.has_changed().unwrap());
    }

    #[tokio::test]
    async fn submit_publishes_event() {
        let registry = JobRegistry::default();
        let mut rx = registry.events().subscribe();

        let id = registry.submit(job("a.png")).await.unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, PipelineEventKind::JobSubmitted { job_id: id });
    }

    #[tokio::test]
    async fn empty_registry_is_settled_immediately() {
        let registry = JobRegistry::default();
        registry.wait_until_settled().await;
    }
}
