//! `backdrop-worker` library crate.
//!
//! Host-side pieces of the batch pipeline: environment configuration,
//! filesystem input/output collaborators and startup wiring. Re-exported
//! for integration testing; the binary entrypoint lives in `main.rs`.

pub mod app;
pub mod canonicalize;
pub mod config;
pub mod storage;
