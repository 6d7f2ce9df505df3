//! Client side of the external image-generation service.
//!
//! Provides the [`GenerationService`] seam the pipeline calls through,
//! the typed response model and its asset-extraction rules, the
//! fixed-budget retry wrapper, and a `reqwest` client for a
//! `generateContent`-style HTTP endpoint.

pub mod api;
pub mod error;
pub mod messages;
pub mod retry;
pub mod service;

pub use api::GenerationApi;
pub use error::{AttemptError, GenerationError, ServiceError};
pub use messages::GenerationResponse;
pub use retry::with_retry;
pub use service::GenerationService;
