// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Catalog Sync
//!
//! Reconciles a supplier product feed against a paginated, rate-limited
//! e-commerce catalog API. Remote categories and products are streamed
//! concurrently, diffed against the feed, and brought in line with batched
//! deletes and creates plus minimal per-record patches.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use catalog_sync::{CatalogClient, FeedSource, Phases, SyncEngine};
//!
//! let feed = FeedSource::File("data.json".into()).load().await?;
//! let engine = SyncEngine::new(catalog);
//! let stats = engine.run_feed(&feed, Phases::default()).await;
//! for report in &stats.reports {
//!     println!("{report}");
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//!                          SyncEngine
//!   categories: stream -> classify -> delete -> move  -> create (2 tiers)
//!   products:   stream -> classify -> delete -> patch -> create (+ re-drive)
//!                              |
//!   +-----------+-----------+--+--------+-----------+------------+
//!   | reader    | batch     | diff      | media     | catalog    |
//!   | X-WP-Total| chunked   | tolerance | HEAD check| 400/429/504|
//!   | pages     | workers   | min patch | search    | recovery   |
//!   +-----------+-----------+-----------+-----------+------------+
//!                              |
//!                HttpClient + RetryPolicy + Sleeper
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Retry driver, backoff policy and sleepers
pub mod retry;

/// Authentication implementations
pub mod auth;

/// HTTP client with retry and rate limiting
pub mod http;

/// Single-consumer-claim work queue shared by worker pools
pub mod queue;

/// Feed and remote data model
pub mod model;

/// Concurrent paginated collection reader
pub mod pagination;

/// Concurrent batch mutation executor
pub mod batch;

/// Image resolution against the media API
pub mod media;

/// Catalog API client
pub mod catalog;

/// Schema conversion and diff engine
pub mod diff;

/// Reconciliation orchestrator
pub mod engine;

/// Supplier feed loading
pub mod feed;

/// Runtime settings
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use catalog::CatalogClient;
pub use config::Settings;
pub use engine::{Phases, SyncConfig, SyncEngine, SyncReport, SyncStats};
pub use feed::FeedSource;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
