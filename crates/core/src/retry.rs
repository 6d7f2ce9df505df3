//! Fixed retry budget and linear backoff schedule for generation calls.
//!
//! The budget is deliberately not configurable per call: every call to
//! the generation service gets the same number of attempts.

use std::time::Duration;

/// Retries allowed after the initial attempt.
pub const MAX_RETRIES: u32 = 2;

/// Total attempts per call (initial attempt + retries).
pub const MAX_ATTEMPTS: u32 = MAX_RETRIES + 1;

/// Unit of the linear backoff; the wait after attempt `n` is `n` units.
pub const RETRY_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Delay to wait after the given failed attempt (1-based) before retrying.
///
/// Returns `None` for the final attempt: nothing follows it.
pub fn retry_delay(attempt: u32) -> Option<Duration> {
    if attempt == 0 || attempt >= MAX_ATTEMPTS {
        return None;
    }
    Some(RETRY_BASE_DELAY * attempt)
}
