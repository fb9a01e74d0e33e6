//! Execution engine module
//!
//! Reconciliation orchestrator.
//!
//! # Overview
//!
//! Each entity kind runs through the same phases:
//!
//! ```text
//! LOAD_SOURCE -> STREAM_REMOTE -> BUILD_LOOKUP -> CLASSIFY -> DELETE -> UPDATE -> CREATE
//! ```
//!
//! Categories run first so products can reference them by ID. Lookups are
//! owned by the orchestrator future; workers only ever append to channels.
//! A failed count probe aborts that kind only; otherwise delete, update and
//! create always all run and every error ends up in the [`SyncReport`].

mod categories;
mod products;
mod types;

pub use types::{Phases, SyncConfig, SyncReport, SyncStats, WorkerPlan};

use crate::batch::{BatchOperation, BatchSummary};
use crate::catalog::CatalogClient;
use crate::error::Error;
use crate::model::{SourceFeed, SourceProduct};
use crate::pagination::CollectionStream;
use crate::types::{CategoryIds, EntityKind, RemoteId};
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Sync engine for reconciling the remote catalog against a feed
#[derive(Debug, Clone)]
pub struct SyncEngine {
    /// Catalog API client
    catalog: CatalogClient,
    /// Sync configuration
    config: SyncConfig,
}

impl SyncEngine {
    /// Create a new sync engine
    pub fn new(catalog: CatalogClient) -> Self {
        Self {
            catalog,
            config: SyncConfig::default(),
        }
    }

    /// Set sync configuration
    #[must_use]
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Sync configuration
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Reconcile the selected kinds against a loaded feed.
    ///
    /// Records the feed could not decode count as skipped products.
    pub async fn run_feed(&self, feed: &SourceFeed, phases: Phases) -> SyncStats {
        self.reconcile(&feed.products, feed.rejected, phases).await
    }

    /// Reconcile the selected kinds, categories first
    pub async fn run(&self, products: &[SourceProduct], phases: Phases) -> SyncStats {
        self.reconcile(products, 0, phases).await
    }

    async fn reconcile(
        &self,
        products: &[SourceProduct],
        rejected: usize,
        phases: Phases,
    ) -> SyncStats {
        let start = Instant::now();
        let mut stats = SyncStats::default();

        let category_ids = if phases.categories {
            let (report, ids) = self.sync_categories(products).await;
            stats.reports.push(report);
            ids
        } else if phases.products {
            self.fetch_category_ids(&mut stats).await
        } else {
            CategoryIds::new()
        };

        if phases.products {
            let mut report = self.sync_products(products, &category_ids).await;
            report.skipped += rejected;
            stats.reports.push(report);
        }

        stats.duration = start.elapsed();
        for report in &stats.reports {
            info!("{report}");
        }
        stats
    }

    /// Read-only category lookup used when the category phase is skipped
    async fn fetch_category_ids(&self, stats: &mut SyncStats) -> CategoryIds {
        let stream = self
            .catalog
            .stream_categories(self.config.page_size, self.config.read_workers);
        let (categories, errors) = stream.collect().await;

        if !errors.is_empty() {
            let mut report = SyncReport::new(EntityKind::Category);
            for err in errors {
                report.record_error(err);
            }
            stats.reports.push(report);
        }

        categories
            .into_iter()
            .filter_map(|c| c.id.map(|id| (c.name, id)))
            .collect()
    }

    /// Batch-delete `ids` of `kind`, counting confirmed deletions
    async fn delete_remote(&self, kind: EntityKind, ids: Vec<RemoteId>, report: &mut SyncReport) {
        if ids.is_empty() {
            info!(kind = %kind, "nothing to delete");
            return;
        }
        info!(kind = %kind, count = ids.len(), "deleting");
        if self.config.dry_run {
            report.deleted += ids.len();
            return;
        }

        let summary = self
            .catalog
            .batch(
                kind,
                BatchOperation::Delete,
                ids,
                self.config.delete.batch_size,
                self.config.delete.workers,
            )
            .drain()
            .await;
        report.deleted += summary.confirmed;
        record_batch_errors(report, summary, false);
    }
}

/// Move batch errors into `report`.
///
/// With `redriven` set, per-item errors are only logged because those items
/// get another attempt through the single-entity path.
fn record_batch_errors(report: &mut SyncReport, summary: BatchSummary, redriven: bool) {
    for err in summary.errors {
        match err {
            Error::BatchItem { .. } if redriven => debug!(error = %err, "batch item failed"),
            err => report.record_error(err),
        }
    }
}

/// Drain `stream`, handing each item to `classify` while errors are
/// collected concurrently.
async fn drain_classified<T, F>(stream: CollectionStream<T>, mut classify: F) -> Vec<Error>
where
    F: FnMut(T),
{
    let CollectionStream {
        mut items,
        mut errors,
    } = stream;

    let consume = async {
        while let Some(item) = items.recv().await {
            classify(item);
        }
    };

    let ((), errors) = tokio::join!(consume, collect_errors(&mut errors));
    errors
}

async fn collect_errors(errors: &mut mpsc::Receiver<Error>) -> Vec<Error> {
    let mut out = Vec::new();
    while let Some(err) = errors.recv().await {
        out.push(err);
    }
    out
}

/// Record stream errors; true when the count probe failed
fn absorb_stream_errors(report: &mut SyncReport, errors: Vec<Error>) -> bool {
    let mut probe_failed = false;
    for err in errors {
        probe_failed |= matches!(err, Error::CountProbe { .. });
        report.record_error(err);
    }
    if probe_failed {
        report.aborted = true;
    }
    probe_failed
}

#[cfg(test)]
mod tests;
