//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`PipelineEvent`]s.
//! It is designed to be shared via `Arc<EventBus>` between the registry,
//! the orchestrator and any UI-facing subscribers.

use backdrop_core::types::{JobId, Timestamp};
use chrono::Utc;
use serde::Serialize;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// PipelineEvent
// ---------------------------------------------------------------------------

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEventKind {
    /// A job entered the registry in `pending`.
    JobSubmitted { job_id: JobId },

    /// A round captured these jobs and moved them to `processing`.
    BatchStarted { batch: u64, job_ids: Vec<JobId> },

    /// A job settled as `done`.
    JobCompleted { batch: u64, job_id: JobId },

    /// A job settled as `error`.
    JobFailed {
        batch: u64,
        job_id: JobId,
        error: String,
    },

    /// Every job of the round has settled.
    BatchFinished { batch: u64, done: usize, failed: usize },

    /// The registry was cleared.
    RegistryReset { removed: usize },
}

/// A lifecycle event plus the time it was published.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineEvent {
    #[serde(flatten)]
    pub kind: PipelineEventKind,
    pub timestamp: Timestamp,
}

impl PipelineEvent {
    pub fn new(kind: PipelineEventKind) -> Self {
        Self {
            kind,
            timestamp: Utc::now(),
        }
    }

    /// Dot-separated event name, e.g. `"batch.started"`.
    pub fn event_type(&self) -> &'static str {
        match self.kind {
            PipelineEventKind::JobSubmitted { .. } => "job.submitted",
            PipelineEventKind::BatchStarted { .. } => "batch.started",
            PipelineEventKind::JobCompleted { .. } => "job.completed",
            PipelineEventKind::JobFailed { .. } => "job.failed",
            PipelineEventKind::BatchFinished { .. } => "batch.finished",
            PipelineEventKind::RegistryReset { .. } => "registry.reset",
        }
    }
}

impl From<PipelineEventKind> for PipelineEvent {
    fn from(kind: PipelineEventKind) -> Self {
        Self::new(kind)
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`PipelineEvent`].
///
/// # Usage
///
/// ```rust
/// use backdrop_events::{EventBus, PipelineEventKind};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(PipelineEventKind::RegistryReset { removed: 0 });
/// ```
pub struct EventBus {
    sender: broadcast::Sender<PipelineEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish(&self, event: impl Into<PipelineEvent>) {
        // Ignore the SendError -- it only means there are zero receivers.
        let _ = self.sender.send(event.into());
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
