use async_trait::async_trait;
use backdrop_core::asset::CanonicalAsset;

use crate::error::ServiceError;
use crate::messages::GenerationResponse;

/// One opaque call to the external image-generation service.
///
/// Implementations perform exactly one request per call and never retry;
/// retries are layered on top by [`with_retry`](crate::retry::with_retry).
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Generate from zero or more input images plus text instructions.
    async fn generate(
        &self,
        inputs: &[CanonicalAsset],
        instructions: &str,
    ) -> Result<GenerationResponse, ServiceError>;
}
