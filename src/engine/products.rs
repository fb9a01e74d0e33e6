//! Product reconciliation

use super::{
    absorb_stream_errors, drain_classified, record_batch_errors, SyncEngine, SyncReport,
};
use crate::batch::{BatchOperation, BatchSummary};
use crate::catalog::CreateOutcome;
use crate::diff::{convert_product, diff_product, validate_source};
use crate::error::Result;
use crate::model::{RemoteImage, RemoteProduct, SourceProduct};
use crate::types::{CategoryIds, EntityKind, RemoteId};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, info, warn};

/// Log update-check progress every this many records
const PROGRESS_EVERY: usize = 100;

/// Source lookup and classification result for one product run.
///
/// Invalid source records stay in the lookup as `None` so that their remote
/// counterpart is neither deleted nor updated.
#[derive(Debug, Default)]
struct ProductPlan<'a> {
    lookup: HashMap<&'a str, Option<&'a SourceProduct>>,
    pending_create: BTreeSet<&'a str>,
    matched: HashSet<String>,
    update_checks: Vec<(&'a SourceProduct, RemoteProduct)>,
    to_delete: Vec<RemoteId>,
    invalid: usize,
}

impl<'a> ProductPlan<'a> {
    fn new(products: &'a [SourceProduct]) -> Self {
        let mut plan = Self::default();
        for source in products {
            let key = source.key().trim();
            if key.is_empty() {
                warn!(name = %source.short_description, "product without a product number skipped");
                plan.invalid += 1;
                continue;
            }
            if plan.lookup.contains_key(key) {
                warn!(sku = key, "duplicate product number in feed, keeping the first");
                continue;
            }

            match validate_source(source) {
                Ok(()) => {
                    plan.lookup.insert(key, Some(source));
                    plan.pending_create.insert(key);
                }
                Err(e) => {
                    warn!(sku = key, error = %e, "invalid product skipped");
                    plan.lookup.insert(key, None);
                    plan.invalid += 1;
                }
            }
        }
        plan
    }

    fn classify(&mut self, remote: RemoteProduct) {
        let Some(id) = remote.id else {
            return;
        };

        match self.lookup.get(remote.key()).copied() {
            Some(source) if self.matched.insert(remote.key().to_string()) => {
                self.pending_create.remove(remote.key());
                if let Some(source) = source {
                    self.update_checks.push((source, remote));
                }
            }
            _ => {
                debug!(id, sku = %remote.sku, "product slated for deletion");
                self.to_delete.push(id);
            }
        }
    }

    fn pending_sources(&self) -> Vec<&'a SourceProduct> {
        self.pending_create
            .iter()
            .filter_map(|key| self.lookup.get(key).copied().flatten())
            .collect()
    }
}

impl SyncEngine {
    /// Reconcile products against the feed
    pub async fn sync_products(
        &self,
        products: &[SourceProduct],
        category_ids: &CategoryIds,
    ) -> SyncReport {
        let mut report = SyncReport::new(EntityKind::Product);
        let mut plan = ProductPlan::new(products);
        report.skipped += plan.invalid;
        info!(source = plan.lookup.len(), "reading remote products");

        let stream = self
            .catalog
            .stream_products(self.config.page_size, self.config.read_workers);
        let errors = drain_classified(stream, |product| plan.classify(product)).await;
        if absorb_stream_errors(&mut report, errors) {
            return report;
        }

        info!(
            delete = plan.to_delete.len(),
            check = plan.update_checks.len(),
            create = plan.pending_create.len(),
            "products classified"
        );

        self.delete_remote(EntityKind::Product, std::mem::take(&mut plan.to_delete), &mut report)
            .await;
        self.update_products(&plan.update_checks, category_ids, &mut report)
            .await;
        self.create_products(plan.pending_sources(), category_ids, &mut report)
            .await;

        report
    }

    async fn resolve_image(&self, source: &SourceProduct) -> Result<Option<RemoteImage>> {
        match source.image() {
            Some(url) => self.catalog.media().resolve_image(url).await,
            None => Ok(None),
        }
    }

    async fn update_products(
        &self,
        checks: &[(&SourceProduct, RemoteProduct)],
        category_ids: &CategoryIds,
        report: &mut SyncReport,
    ) {
        for (checked, (source, remote)) in checks.iter().enumerate() {
            if checked > 0 && checked % PROGRESS_EVERY == 0 {
                info!(checked, total = checks.len(), "update-checking products");
            }
            let Some(id) = remote.id else {
                continue;
            };

            let image = match self.resolve_image(source).await {
                Ok(image) => image,
                Err(e) => {
                    report.record_error(format!("product {}: {e}", source.key()));
                    continue;
                }
            };
            let Some(patch) = diff_product(source, remote, category_ids, image.as_ref()) else {
                continue;
            };

            debug!(sku = source.key(), fields = ?patch.changed_fields(), "updating product");
            if self.config.dry_run {
                report.updated += 1;
                continue;
            }
            match self.catalog.update_product(id, &patch).await {
                Ok(()) => report.updated += 1,
                Err(e) => report.record_error(format!("failed to update product {}: {e}", source.key())),
            }
            self.catalog.pace().await;
        }
    }

    /// Convert and batch-create pending products, then re-drive the ones the
    /// batch did not confirm through the single-entity path.
    async fn create_products(
        &self,
        pending: Vec<&SourceProduct>,
        category_ids: &CategoryIds,
        report: &mut SyncReport,
    ) {
        if pending.is_empty() {
            info!("no products to create");
            return;
        }

        let mut payload = Vec::with_capacity(pending.len());
        for source in pending {
            match self.catalog.sku_exists(source.key()).await {
                Ok(false) => {}
                Ok(true) => {
                    debug!(sku = source.key(), "product already exists");
                    report.skipped += 1;
                    continue;
                }
                Err(e) => {
                    report.record_error(format!("SKU check for {} failed: {e}", source.key()));
                    continue;
                }
            }

            let image = if self.config.dry_run {
                None
            } else {
                match self.resolve_image(source).await {
                    Ok(image) => image,
                    Err(e) => {
                        report.record_error(format!("product {}: {e}", source.key()));
                        continue;
                    }
                }
            };
            payload.push(convert_product(source, category_ids, image).product);
        }

        info!(count = payload.len(), "creating products");
        if self.config.dry_run || payload.is_empty() {
            report.created += payload.len();
            return;
        }

        let summary = self
            .catalog
            .batch(
                EntityKind::Product,
                BatchOperation::Create,
                payload.iter().collect::<Vec<_>>(),
                self.config.product_create.batch_size,
                self.config.product_create.workers,
            )
            .drain()
            .await;
        report.created += summary.confirmed;

        let redrive = unconfirmed_positions(&summary, payload.len());
        record_batch_errors(report, summary, true);
        if redrive.is_empty() {
            return;
        }

        info!(count = redrive.len(), "creating products one by one");
        for position in redrive {
            let Some(product) = payload.get(position) else {
                continue;
            };
            let sku = product.sku.clone();
            match self.catalog.create_product(product.clone()).await {
                Ok(CreateOutcome::Created(_)) => report.created += 1,
                Ok(CreateOutcome::AlreadyExists) => report.skipped += 1,
                Err(e) => report.record_error(format!("failed to create product {sku}: {e}")),
            }
            self.catalog.pace().await;
        }
    }
}

/// Positions that failed inside an applied chunk or were never acknowledged
fn unconfirmed_positions(summary: &BatchSummary, total: usize) -> Vec<usize> {
    let mut acknowledged = vec![false; total];
    for ack in &summary.acks {
        for position in ack.offset..ack.offset + ack.entities {
            if let Some(slot) = acknowledged.get_mut(position) {
                *slot = true;
            }
        }
    }

    let mut positions = summary.failed_positions();
    positions.extend((0..total).filter(|p| !acknowledged[*p]));
    positions.sort_unstable();
    positions.dedup();
    positions
}
