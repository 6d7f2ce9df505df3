//! Batch job orchestration for backdrop generation.
//!
//! - [`JobRegistry`] -- insertion-ordered job records, status transitions,
//!   batch capture and change notification.
//! - [`SharedResourceCache`] -- generates the shared backdrop once and
//!   hands it to every job.
//! - [`Orchestrator`] -- waits for pending work, runs one batch at a time,
//!   fans jobs out concurrently and records each outcome.
//! - [`collaborators`] -- host-provided input canonicalization and output
//!   storage.

pub mod collaborators;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod registry;
pub mod shared;

pub use collaborators::{AssetStore, Canonicalizer, MemoryAssetStore};
pub use config::PipelineConfig;
pub use error::PipelineError;
pub use orchestrator::{JobProcessor, Orchestrator, RoundSummary};
pub use registry::{Batch, JobRegistry, StatusCounts};
pub use shared::SharedResourceCache;
