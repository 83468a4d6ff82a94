//! Retry and backoff policy.
//!
//! Error classification (timeouts, throttling, connection failures) and
//! exponential backoff decisions shared by every platform request, so the
//! jobs never carry their own retry loops.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::{classify, classify_curl_error, classify_http_status};
pub use error::RequestError;
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
