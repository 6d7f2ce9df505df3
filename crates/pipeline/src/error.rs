use backdrop_genai::GenerationError;

use crate::collaborators::{ConversionError, StoreError};

/// Terminal failure of one job. Its `Display` text is what the registry
/// records as the job's error message.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The raw input could not be canonicalized. Not retried.
    #[error("Could not prepare input: {0}")]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Could not store output: {0}")]
    Storage(#[from] StoreError),

    /// The per-job task panicked or was aborted.
    #[error("Processing task failed: {0}")]
    TaskFailed(String),
}
