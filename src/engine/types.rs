//! Engine types
//!
//! Configuration and reporting for the reconciliation engine.

use crate::types::EntityKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::error;

/// Worker pool size and chunk size for one batched phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerPlan {
    /// Concurrent workers
    pub workers: usize,
    /// Entities per request
    pub batch_size: usize,
}

impl WorkerPlan {
    /// Create a plan
    pub fn new(workers: usize, batch_size: usize) -> Self {
        Self {
            workers,
            batch_size,
        }
    }
}

/// Configuration for a sync run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Items per listing page
    pub page_size: u32,
    /// Concurrent page readers
    pub read_workers: usize,
    /// Batch delete plan (both kinds)
    pub delete: WorkerPlan,
    /// Batch create plan for categories
    pub category_create: WorkerPlan,
    /// Batch create plan for products
    pub product_create: WorkerPlan,
    /// Compute everything, mutate nothing
    pub dry_run: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: 100,
            read_workers: 10,
            delete: WorkerPlan::new(3, 40),
            category_create: WorkerPlan::new(4, 10),
            product_create: WorkerPlan::new(1, 10),
            dry_run: false,
        }
    }
}

impl SyncConfig {
    /// Create a new sync config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set listing page size and reader count
    #[must_use]
    pub fn with_reading(mut self, page_size: u32, workers: usize) -> Self {
        self.page_size = page_size;
        self.read_workers = workers;
        self
    }

    /// Set dry-run mode
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Which entity kinds a run reconciles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Phases {
    /// Reconcile categories
    pub categories: bool,
    /// Reconcile products
    pub products: bool,
}

impl Default for Phases {
    fn default() -> Self {
        Self {
            categories: true,
            products: true,
        }
    }
}

/// Outcome of reconciling one entity kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Entity kind
    pub kind: EntityKind,
    /// Entities created remotely
    pub created: usize,
    /// Entities patched remotely
    pub updated: usize,
    /// Entities deleted remotely
    pub deleted: usize,
    /// Source records skipped (invalid, already present, unresolvable)
    pub skipped: usize,
    /// Reconciliation stopped before classification completed
    pub aborted: bool,
    /// Accumulated error messages
    pub errors: Vec<String>,
}

impl SyncReport {
    /// Empty report for `kind`
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            created: 0,
            updated: 0,
            deleted: 0,
            skipped: 0,
            aborted: false,
            errors: Vec::new(),
        }
    }

    /// Log and keep an error message
    pub fn record_error(&mut self, err: impl fmt::Display) {
        let message = err.to_string();
        error!(kind = %self.kind, "{message}");
        self.errors.push(message);
    }

    /// True when any error was recorded
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: created {}, updated {}, deleted {}, skipped {}, errors {}",
            self.kind.plural(),
            self.created,
            self.updated,
            self.deleted,
            self.skipped,
            self.errors.len()
        )?;
        if self.aborted {
            f.write_str(" (aborted)")?;
        }
        Ok(())
    }
}

/// Statistics from a full run
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// One report per reconciled kind, in run order
    pub reports: Vec<SyncReport>,
    /// Wall-clock duration
    pub duration: Duration,
}

impl SyncStats {
    /// Report for `kind`, if it ran
    pub fn report(&self, kind: EntityKind) -> Option<&SyncReport> {
        self.reports.iter().find(|r| r.kind == kind)
    }

    /// Total error messages across kinds
    pub fn error_count(&self) -> usize {
        self.reports.iter().map(|r| r.errors.len()).sum()
    }

    /// True when any kind recorded an error
    pub fn has_errors(&self) -> bool {
        self.reports.iter().any(SyncReport::has_errors)
    }
}
