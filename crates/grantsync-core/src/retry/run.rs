//! Retry loop: run a closure until success or policy says stop.

use super::classify;
use super::error::RequestError;
use super::policy::{RetryDecision, RetryPolicy};

/// Runs a closure until it succeeds or the retry policy says to stop.
/// The closure receives the 1-based attempt number. On retryable failure,
/// sleeps for the backoff duration then tries again.
pub fn run_with_retry<T, F>(policy: &RetryPolicy, mut f: F) -> Result<T, RequestError>
where
    F: FnMut(u32) -> Result<T, RequestError>,
{
    let mut attempt = 1u32;
    loop {
        match f(attempt) {
            Ok(v) => return Ok(v),
            Err(e) => {
                let kind = classify::classify(&e);
                match policy.decide(attempt, kind) {
                    RetryDecision::NoRetry => {
                        if attempt > 1 {
                            tracing::warn!(attempt, error = %e, "giving up after {} attempts", attempt);
                        }
                        return Err(e);
                    }
                    RetryDecision::RetryAfter(d) => {
                        tracing::warn!(attempt, error = %e, ?kind, "attempt failed, retrying in {:?}", d);
                        std::thread::sleep(d);
                        attempt += 1;
                    }
                }
            }
        }
    }
}
