//! Backoff policy
//!
//! Delays are a fixed base plus a bounded random jitter. While rate limited
//! the jitter range is multiplied and the base doubles per consecutive
//! attempt, capped at `max_backoff`. The rate-limited jitter never reaches
//! the next doubling step, so consecutive sleeps strictly increase.

use rand::Rng;
use reqwest::StatusCode;
use std::time::Duration;

/// Retry and pacing policy for remote requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Fixed part of every delay
    pub base_delay: Duration,
    /// Upper bound of the random part of a delay
    pub jitter: Duration,
    /// Jitter multiplier applied while rate limited
    pub rate_limit_jitter_factor: u32,
    /// Cap on the escalated base while rate limited
    pub max_backoff: Duration,
    /// Delay between attempts after a network error
    pub network_retry_delay: Duration,
    /// Retry limit for network errors (`None` = unbounded)
    pub max_network_attempts: Option<u32>,
    /// Retry limit for 429/504 responses (`None` = unbounded)
    pub max_rate_limit_retries: Option<u32>,
    /// Pause between successive requests of one worker
    pub pace_between_requests: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            jitter: Duration::from_secs(1),
            rate_limit_jitter_factor: 4,
            max_backoff: Duration::from_secs(60),
            network_retry_delay: Duration::from_secs(1),
            max_network_attempts: None,
            max_rate_limit_retries: None,
            pace_between_requests: true,
        }
    }
}

impl RetryPolicy {
    /// Create the default policy
    pub fn new() -> Self {
        Self::default()
    }

    /// Policy with no jitter and millisecond delays, for tests and local mocks
    pub fn immediate() -> Self {
        Self {
            base_delay: Duration::from_millis(1),
            jitter: Duration::ZERO,
            rate_limit_jitter_factor: 4,
            max_backoff: Duration::from_millis(50),
            network_retry_delay: Duration::from_millis(1),
            max_network_attempts: Some(3),
            max_rate_limit_retries: Some(10),
            pace_between_requests: false,
        }
    }

    /// Set the network retry limit
    #[must_use]
    pub fn with_max_network_attempts(mut self, max: Option<u32>) -> Self {
        self.max_network_attempts = max;
        self
    }

    /// Delay used between ordinary requests: base plus jitter
    pub fn pause_delay(&self) -> Duration {
        self.base_delay + sample_jitter(self.jitter)
    }

    /// Pacing delay for a worker, if pacing is enabled
    pub fn pacing_delay(&self) -> Option<Duration> {
        self.pace_between_requests.then(|| self.pause_delay())
    }

    /// Delay before retrying the `attempt`-th (zero-based) rate-limited request.
    ///
    /// Strictly greater than the previous attempt's delay until the base
    /// reaches `max_backoff`; from there on it stays at the cap.
    pub fn rate_limited_delay(&self, attempt: u32) -> Duration {
        let base = self.escalated_base(attempt);
        let step = self
            .escalated_base(attempt.saturating_add(1))
            .saturating_sub(base);
        let range = self
            .jitter
            .saturating_mul(self.rate_limit_jitter_factor)
            .min(step.saturating_sub(Duration::from_millis(1)));
        base + sample_jitter(range)
    }

    /// Deterministic part of [`Self::rate_limited_delay`]
    pub fn escalated_base(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_backoff)
    }
}

fn sample_jitter(range: Duration) -> Duration {
    let range_ms = range.as_millis() as u64;
    if range_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..=range_ms))
}

/// How a response status should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// One of the expected success statuses
    Success,
    /// 429 Too Many Requests
    RateLimited,
    /// 504 Gateway Timeout
    GatewayTimeout,
    /// Anything else
    Fatal,
}

/// Classify `status` against the statuses a call accepts as success
pub fn classify_status(status: StatusCode, success: &[StatusCode]) -> StatusClass {
    if success.contains(&status) {
        StatusClass::Success
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        StatusClass::RateLimited
    } else if status == StatusCode::GATEWAY_TIMEOUT {
        StatusClass::GatewayTimeout
    } else {
        StatusClass::Fatal
    }
}
