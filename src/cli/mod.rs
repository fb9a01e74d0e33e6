//! CLI module
//!
//! Command-line interface for syncing the catalog.
//!
//! # Commands
//!
//! - `sync` - Reconcile categories and products against the feed
//! - `check` - Probe the remote catalog and print entity counts

mod commands;
mod runner;

pub use commands::{Cli, Commands, Credentials, SourceKind};
pub use runner::{RunStatus, Runner};
