//! Retry module
//!
//! Jittered backoff computation and the uniform retry driver shared by every
//! component that talks to the remote catalog.
//!
//! # Overview
//!
//! Callers express one attempt as a future resolving to an [`Attempt`]:
//! `Success(v)`, `Retry(delay)` or `Fatal(err)`. [`retry`] drives attempts
//! until success, a fatal error, or the optional attempt limit, sleeping
//! through an injectable [`Sleeper`] between attempts.

mod policy;
mod sleeper;

pub use policy::{classify_status, RetryPolicy, StatusClass};
pub use sleeper::{RecordingSleeper, Sleeper, TokioSleeper};

use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Outcome of a single attempt
#[derive(Debug)]
pub enum Attempt<T> {
    /// The attempt succeeded
    Success(T),
    /// The attempt should be repeated after the delay
    Retry(Duration),
    /// The attempt failed and must not be repeated
    Fatal(Error),
}

/// Drive `op` until it succeeds or fails fatally.
///
/// `op` receives the zero-based attempt number. `limit` caps the number of
/// retries; `None` retries without bound.
pub async fn retry<T, F, Fut>(sleeper: &dyn Sleeper, limit: Option<u32>, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Attempt<T>>,
{
    let mut attempt = 0u32;
    loop {
        match op(attempt).await {
            Attempt::Success(value) => return Ok(value),
            Attempt::Fatal(err) => return Err(err),
            Attempt::Retry(delay) => {
                if limit.is_some_and(|max| attempt >= max) {
                    return Err(Error::MaxRetriesExceeded {
                        max_retries: attempt,
                    });
                }
                debug!(attempt, ?delay, "retrying after backoff");
                sleeper.sleep(delay).await;
                attempt = attempt.saturating_add(1);
            }
        }
    }
}
