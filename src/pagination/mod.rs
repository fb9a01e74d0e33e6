//! Pagination module
//!
//! Drains a remote collection of unknown length into a bounded stream.
//!
//! # Overview
//!
//! The reader probes the collection size through the `X-WP-Total` header,
//! turns it into a finite queue of page indices and lets a fixed pool of
//! workers fetch pages concurrently. Items and fatal errors travel on two
//! channels that close only after every worker has exited. No ordering is
//! guaranteed across pages.

mod reader;
mod types;

pub use reader::{CollectionReader, TOTAL_HEADER};
pub use types::{page_count, CollectionStream, Listing};
