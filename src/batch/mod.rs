//! Batch mutation module
//!
//! Applies large create/update/delete sets through the catalog's batch
//! endpoint with partial-failure isolation: a chunk either lands or is
//! reported, and a failing worker never takes its siblings down.

mod executor;
mod types;

pub use executor::BatchExecutor;
pub use types::{BatchOperation, BatchRun, BatchSummary, ChunkAck};
