//! Shared domain types for the backdrop batch pipeline.
//!
//! Pure data and rules only: job records and their status machine,
//! image payloads, and the fixed retry schedule used when calling the
//! generation service. Nothing here performs I/O.

pub mod asset;
pub mod error;
pub mod job;
pub mod retry;
pub mod types;
