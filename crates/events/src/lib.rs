//! Pipeline lifecycle events.
//!
//! - [`EventBus`] -- in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PipelineEvent`] -- job and batch lifecycle notifications consumed by
//!   presentation layers.

pub mod bus;

pub use bus::{EventBus, PipelineEvent, PipelineEventKind};
