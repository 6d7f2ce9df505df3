//! Job records and the per-job status machine.
//!
//! ```text
//! pending ──► processing ──► done
//!                  │
//!                  └───────► error
//! ```
//!
//! `done` and `error` are terminal. Only the orchestrator moves a job
//! forward; the registry rejects any other transition.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::asset::{AssetRef, CanonicalMode};
use crate::error::CoreError;
use crate::types::{JobId, Timestamp};

// ---------------------------------------------------------------------------
// JobStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a single job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Submitted, waiting for the next batch round.
    Pending,
    /// Captured by an in-flight batch.
    Processing,
    /// Generated successfully; the job carries an output reference.
    Done,
    /// Failed terminally; the job carries an error message.
    Error,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Done => "done",
            Self::Error => "error",
        }
    }

    /// `true` for `done` and `error`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }

    /// Whether a job may move from `self` to `next`.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Processing, Self::Done)
                | (Self::Processing, Self::Error)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// A request to add a job to the registry.
#[derive(Debug, Clone)]
pub struct NewJob {
    /// Caller-supplied identity. Generated when absent.
    pub id: Option<JobId>,
    /// Display label, usually the uploaded file name.
    pub name: String,
    pub input: AssetRef,
    pub mode: CanonicalMode,
}

impl NewJob {
    pub fn new(name: impl Into<String>, input: impl Into<AssetRef>) -> Self {
        Self {
            id: None,
            name: name.into(),
            input: input.into(),
            mode: CanonicalMode::default(),
        }
    }

    pub fn with_id(mut self, id: JobId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_mode(mut self, mode: CanonicalMode) -> Self {
        self.mode = mode;
        self
    }
}

/// One unit of work tracked through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub name: String,
    pub input: AssetRef,
    pub mode: CanonicalMode,
    pub status: JobStatus,
    /// Set exactly once, when the job reaches `done`.
    pub output: Option<AssetRef>,
    /// Set only when the job reaches `error`.
    pub error: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// The terminal result of processing one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Done(AssetRef),
    Failed(String),
}

impl JobOutcome {
    pub fn status(&self) -> JobStatus {
        match self {
            Self::Done(_) => JobStatus::Done,
            Self::Failed(_) => JobStatus::Error,
        }
    }
}

impl Job {
    /// Build a fresh `pending` record.
    pub fn pending(id: JobId, request: NewJob) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: request.name,
            input: request.input,
            mode: request.mode,
            status: JobStatus::Pending,
            output: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Return a copy of this job moved to `processing`.
    pub fn start(&self) -> Result<Job, CoreError> {
        self.check_transition(JobStatus::Processing)?;
        Ok(Job {
            status: JobStatus::Processing,
            updated_at: Utc::now(),
            ..self.clone()
        })
    }

    /// Return a copy of this job settled with `outcome`.
    pub fn settle(&self, outcome: JobOutcome) -> Result<Job, CoreError> {
        self.check_transition(outcome.status())?;
        let (status, output, error) = match outcome {
            JobOutcome::Done(output) => (JobStatus::Done, Some(output), None),
            JobOutcome::Failed(message) => (JobStatus::Error, None, Some(message)),
        };
        Ok(Job {
            status,
            output,
            error,
            updated_at: Utc::now(),
            ..self.clone()
        })
    }

    fn check_transition(&self, to: JobStatus) -> Result<(), CoreError> {
        if self.status.can_transition_to(to) {
            Ok(())
        } else {
            Err(CoreError::InvalidTransition {
                id: self.id,
                from: self.status,
                to,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use uuid::Uuid;

    use super::*;

    fn pending_job() -> Job {
        Job::pending(Uuid::now_v7(), NewJob::new("cat.png", "uploads/cat.png"))
    }

    #[test]
    fn new_job_starts_pending_without_output_or_error() {
        let job = pending_job();
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.output.is_none());
        assert!(job.error.is_none());
        assert_eq!(job.mode, CanonicalMode::Square);
    }

    #[test]
    fn happy_path_sets_output_once() {
        let job = pending_job().start().unwrap();
        assert_eq!(job.status, JobStatus::Processing);

        let done = job.settle(JobOutcome::Done(AssetRef::new("out/cat.png"))).unwrap();
        assert_eq!(done.status, JobStatus::Done);
        assert_eq!(done.output, Some(AssetRef::new("out/cat.png")));
        assert!(done.error.is_none());
    }

    #[test]
    fn failure_records_message_and_no_output() {
        let failed = pending_job()
            .start()
            .unwrap()
            .settle(JobOutcome::Failed("boom".into()))
            .unwrap();
        assert_eq!(failed.status, JobStatus::Error);
        assert_eq!(failed.error.as_deref(), Some("boom"));
        assert!(failed.output.is_none());
    }

    #[test]
    fn pending_job_cannot_settle_directly() {
        let result = pending_job().settle(JobOutcome::Failed("nope".into()));
        assert_matches!(
            result,
            Err(CoreError::InvalidTransition {
                from: JobStatus::Pending,
                to: JobStatus::Error,
                ..
            })
        );
    }

    #[test]
    fn terminal_states_never_move() {
        let done = pending_job()
            .start()
            .unwrap()
            .settle(JobOutcome::Done(AssetRef::new("x")))
            .unwrap();
        assert!(done.start().is_err());
        assert!(done.settle(JobOutcome::Failed("late".into())).is_err());

        for status in [JobStatus::Done, JobStatus::Error] {
            assert!(status.is_terminal());
            for next in [
                JobStatus::Pending,
                JobStatus::Processing,
                JobStatus::Done,
                JobStatus::Error,
            ] {
                assert!(!status.can_transition_to(next));
            }
        }
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&JobStatus::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
    }
}
