//! Fixed-budget retry wrapper for generation calls.
//!
//! [`with_retry`] runs one logical call to the generation service up to
//! [`MAX_ATTEMPTS`] times, sleeping [`retry_delay`] between attempts.
//! Every failure shape (transport error, empty response, missing image,
//! policy block) is retried the same way.

use std::future::Future;

use backdrop_core::asset::GeneratedAsset;
use backdrop_core::retry::{retry_delay, MAX_ATTEMPTS};

use crate::error::{AttemptError, GenerationError, ServiceError};
use crate::messages::GenerationResponse;

/// Run `call` until it yields an image or the retry budget is spent.
///
/// `operation` names the call in logs and in the final error. The delay
/// only suspends this call's future; other tasks keep running.
pub async fn with_retry<F, Fut>(operation: &str, mut call: F) -> Result<GeneratedAsset, GenerationError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<GenerationResponse, ServiceError>>,
{
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        let error = match call().await {
            Ok(response) => match response.into_asset() {
                Ok(asset) => {
                    if attempt > 1 {
                        tracing::info!(operation, attempt, "Generation succeeded after retry");
                    }
                    return Ok(asset);
                }
                Err(e) => e,
            },
            Err(e) => AttemptError::Service(e),
        };

        tracing::warn!(
            operation,
            attempt,
            total_attempts = MAX_ATTEMPTS,
            error = %error,
            "Generation attempt {attempt}/{MAX_ATTEMPTS} failed",
        );

        match retry_delay(attempt) {
            Some(delay) => tokio::time::sleep(delay).await,
            None => {
                return Err(GenerationError::Exhausted {
                    operation: operation.to_string(),
                    attempts: attempt,
                    last_error: error,
                })
            }
        }
    }
}
