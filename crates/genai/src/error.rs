//! Error types for generation calls.
//!
//! [`ServiceError`] is a transport-level failure of one request,
//! [`AttemptError`] is any reason a single attempt did not yield an image,
//! and [`GenerationError`] is what a caller sees once the retry budget is
//! spent.

/// Errors from the service transport layer.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("Generation API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// Any other implementation-specific failure.
    #[error("Generation service unavailable: {0}")]
    Unavailable(String),
}

/// Why a single call attempt did not produce an image.
///
/// Every variant is retried the same way.
#[derive(Debug, thiserror::Error)]
pub enum AttemptError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Response contained no content")]
    EmptyResponse,

    #[error("Response contained no generated image")]
    NoAsset,

    #[error("Request blocked by content policy: {0}")]
    PolicyBlocked(String),

    #[error("Generated image payload could not be decoded: {0}")]
    InvalidPayload(String),
}

/// Terminal failure of a retried generation call.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("{operation} failed after {attempts} attempts: {last_error}")]
    Exhausted {
        operation: String,
        attempts: u32,
        last_error: AttemptError,
    },
}
