//! HTTP transport module
//!
//! Provides the single-request transport every higher component builds on.
//!
//! # Features
//!
//! - **JSON marshaling**: request bodies and typed response decoding
//! - **Network retry**: optional, unbounded by default, via the retry driver
//! - **Response capture**: status, headers, body and elapsed time
//! - **Client-side pacing**: token bucket rate limiter using governor
//!
//! Status codes are not turned into errors here; callers classify them
//! because 400/429/504 carry recoverable meaning for the catalog API.

mod client;
mod rate_limit;

pub use client::{HttpClient, HttpClientConfig, HttpResponse, RequestConfig, Transport};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
