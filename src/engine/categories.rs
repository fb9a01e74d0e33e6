//! Category reconciliation

use super::{
    absorb_stream_errors, drain_classified, record_batch_errors, SyncEngine, SyncReport,
};
use crate::batch::{BatchOperation, BatchSummary};
use crate::model::{
    required_categories, CategoryPatch, CategoryRecord, RemoteCategory, SourceProduct,
};
use crate::types::{CategoryIds, EntityKind, RemoteId};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info, warn};

/// Lookups built while classifying the remote category listing
#[derive(Debug, Default)]
struct CategoryPlan {
    required: BTreeMap<String, CategoryRecord>,
    pending_create: BTreeSet<String>,
    remote_parents: HashMap<String, Option<RemoteId>>,
    to_delete: Vec<RemoteId>,
}

impl CategoryPlan {
    fn new(products: &[SourceProduct]) -> Self {
        let required = required_categories(products);
        let pending_create = required.keys().cloned().collect();
        Self {
            required,
            pending_create,
            ..Self::default()
        }
    }

    fn classify(&mut self, remote: RemoteCategory) {
        let Some(id) = remote.id else {
            return;
        };

        let already_matched = self.remote_parents.contains_key(&remote.name);
        let Some(record) = self.required.get_mut(&remote.name).filter(|_| !already_matched)
        else {
            debug!(id, name = %remote.name, "category slated for deletion");
            self.to_delete.push(id);
            return;
        };

        record.id = Some(id);
        self.pending_create.remove(&remote.name);
        self.remote_parents
            .insert(remote.name.clone(), remote.parent_id());
        self.backfill_children(&remote.name, id);
    }

    /// Give every category nested under `parent` its parent ID
    fn backfill_children(&mut self, parent: &str, id: RemoteId) {
        for child in self.required.values_mut() {
            if child.parent_name.as_deref() == Some(parent) {
                child.parent_id = Some(id);
            }
        }
    }

    /// Matched categories whose remote parent differs from the wanted one
    fn parent_patches(&self) -> Vec<(String, RemoteId, CategoryPatch)> {
        self.required
            .values()
            .filter_map(|record| {
                let id = record.id?;
                let current = self.remote_parents.get(&record.name)?;
                let wanted = match (&record.parent_name, record.parent_id) {
                    (None, _) => None,
                    (Some(_), Some(parent)) => Some(parent),
                    // parent not created yet
                    (Some(_), None) => return None,
                };
                (current != &wanted).then(|| {
                    let patch = CategoryPatch {
                        parent: Some(wanted.unwrap_or(0)),
                    };
                    (record.name.clone(), id, patch)
                })
            })
            .collect()
    }

    /// Matched categories whose parent is only about to be created
    fn moves_after_create(&self) -> usize {
        self.required
            .values()
            .filter(|record| self.remote_parents.contains_key(&record.name))
            .filter(|record| record.awaiting_parent())
            .count()
    }

    fn category_ids(&self) -> CategoryIds {
        self.required
            .values()
            .filter_map(|record| record.id.map(|id| (record.name.clone(), id)))
            .collect()
    }

    /// Pending categories creatable now: roots and children with a known parent
    fn ready_to_create(&self) -> Vec<String> {
        self.pending_create
            .iter()
            .filter(|name| {
                self.required
                    .get(*name)
                    .is_some_and(|record| !record.awaiting_parent())
            })
            .cloned()
            .collect()
    }

    fn payload(&self, name: &str) -> RemoteCategory {
        RemoteCategory {
            name: name.to_string(),
            parent: self.required.get(name).and_then(|r| r.parent_id),
            ..RemoteCategory::default()
        }
    }
}

impl SyncEngine {
    /// Reconcile categories; returns the report and the name to ID lookup
    pub async fn sync_categories(
        &self,
        products: &[SourceProduct],
    ) -> (SyncReport, CategoryIds) {
        let mut report = SyncReport::new(EntityKind::Category);
        let mut plan = CategoryPlan::new(products);
        info!(required = plan.required.len(), "reading remote categories");

        let stream = self
            .catalog
            .stream_categories(self.config.page_size, self.config.read_workers);
        let errors = drain_classified(stream, |category| plan.classify(category)).await;
        if absorb_stream_errors(&mut report, errors) {
            return (report, CategoryIds::new());
        }

        info!(
            delete = plan.to_delete.len(),
            create = plan.pending_create.len(),
            "categories classified"
        );

        self.delete_remote(EntityKind::Category, std::mem::take(&mut plan.to_delete), &mut report)
            .await;
        self.update_categories(&mut plan, &mut report).await;
        self.create_categories(&mut plan, &mut report).await;
        // existing children of categories created just now
        self.update_categories(&mut plan, &mut report).await;

        (report, plan.category_ids())
    }

    /// Move matched categories under their wanted parent; each move is tried once
    async fn update_categories(&self, plan: &mut CategoryPlan, report: &mut SyncReport) {
        for (name, id, patch) in plan.parent_patches() {
            debug!(name = %name, id, parent = ?patch.parent, "moving category");
            plan.remote_parents
                .insert(name.clone(), patch.parent.filter(|parent| *parent != 0));
            if self.config.dry_run {
                report.updated += 1;
                continue;
            }
            match self.catalog.update_category(id, &patch).await {
                Ok(()) => report.updated += 1,
                Err(e) => report.record_error(format!("failed to update category {name:?}: {e}")),
            }
            self.catalog.pace().await;
        }
    }

    /// Create roots first, then children whose parent IDs the first tier assigned
    async fn create_categories(&self, plan: &mut CategoryPlan, report: &mut SyncReport) {
        if plan.pending_create.is_empty() {
            info!("no categories to create");
            return;
        }
        if self.config.dry_run {
            report.created += std::mem::take(&mut plan.pending_create).len();
            report.updated += plan.moves_after_create();
            return;
        }

        for tier in 1..=2 {
            let names = plan.ready_to_create();
            if names.is_empty() {
                continue;
            }
            info!(tier, count = names.len(), "creating categories");

            let payload: Vec<RemoteCategory> = names.iter().map(|n| plan.payload(n)).collect();
            let summary = self
                .catalog
                .batch(
                    EntityKind::Category,
                    BatchOperation::Create,
                    payload,
                    self.config.category_create.batch_size,
                    self.config.category_create.workers,
                )
                .drain()
                .await;

            apply_created(plan, &names, &summary);
            for name in &names {
                plan.pending_create.remove(name);
            }
            report.created += summary.confirmed;
            record_batch_errors(report, summary, false);
        }

        for name in std::mem::take(&mut plan.pending_create) {
            warn!(name = %name, "category skipped, its parent could not be created");
            report.skipped += 1;
        }
    }
}

fn apply_created(plan: &mut CategoryPlan, names: &[String], summary: &BatchSummary) {
    for (position, id) in summary.assigned_ids() {
        let Some(name) = names.get(position) else {
            continue;
        };
        if let Some(record) = plan.required.get_mut(name) {
            record.id = Some(id);
        }
        plan.backfill_children(name, id);
    }
}
