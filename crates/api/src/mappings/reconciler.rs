//! Mapping Reconciler
//!
//! Applies an edited batch of mapping rows, as submitted by the admin UI, to
//! a [`MappingStore`].
//!
//! # Row semantics
//! | mapping id | domain    | operation |
//! |------------|-----------|-----------|
//! | set        | empty     | delete    |
//! | set        | non-empty | update    |
//! | empty      | non-empty | insert    |
//! | empty      | empty     | nothing   |
//!
//! # Ordering
//! Rows commit one at a time in two phases. Phase one releases: deletes, then
//! updates, where an update claiming a value currently held by another updated
//! mapping runs after that mapping. Phase two claims: inserts. A domain moving
//! between sites inside one batch is therefore always released before it is
//! claimed again.
//!
//! Updates that wait on each other in a cycle (two mappings swapping domains)
//! cannot be ordered. Each of them is split: the stored mapping is released in
//! phase one and the row's values are claimed as a new mapping in phase two,
//! so the claimed mapping gets a new id.
//!
//! Rejected rows never stop the rest of the batch.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use sitehost_shared::{DomainMapping, MappingId, NewMapping, PageId, SiteId};

use super::domain::{is_valid_hostname, normalize_domain};
use super::store::MappingStore;

/// One submitted row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileRow {
    #[serde(default)]
    pub mapping_id: Option<MappingId>,
    pub site_id: SiteId,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub default_page_id: Option<PageId>,
}

/// Why a row was rejected, and the value it was rejected for
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    pub message: String,
    pub value: String,
}

impl RowError {
    fn new(message: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            value: value.into(),
        }
    }
}

/// A committed change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum AppliedChange {
    Deleted { row: usize, mapping_id: MappingId },
    /// Stored mapping dropped ahead of a claim later in the batch
    Released { row: usize, mapping_id: MappingId },
    Updated { row: usize, mapping: DomainMapping },
    Inserted { row: usize, mapping: DomainMapping },
}

/// Result of a reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// True when no row was rejected
    pub success: bool,
    /// Rejected rows keyed by submission index
    pub errors: BTreeMap<usize, RowError>,
    /// Committed changes in commit order
    pub applied: Vec<AppliedChange>,
}

impl ReconcileReport {
    pub fn has_commits(&self) -> bool {
        !self.applied.is_empty()
    }
}

/// A store operation derived from one row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Delete { id: MappingId },
    Release { id: MappingId },
    Update { id: MappingId, mapping: NewMapping },
    Insert { mapping: NewMapping },
}

/// Operations in commit order plus the rows rejected while planning
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReconcilePlan {
    pub operations: Vec<(usize, Operation)>,
    pub errors: BTreeMap<usize, RowError>,
}

/// Validate and order a batch.
///
/// `current` holds the stored state of every mapping the batch refers to by
/// id; a row naming an id missing from it is rejected.
pub fn plan(rows: &[ReconcileRow], current: &BTreeMap<MappingId, DomainMapping>) -> ReconcilePlan {
    let mut errors = BTreeMap::new();
    let mut seen_domains = HashSet::new();
    let mut seen_sites = HashSet::new();
    let mut seen_pages = HashSet::new();

    let mut deletes = Vec::new();
    let mut updates = Vec::new();
    let mut inserts = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        let domain = normalize_domain(&row.domain);

        if let Some(id) = row.mapping_id {
            if !current.contains_key(&id) {
                errors.insert(index, RowError::new("Unknown domain mapping", id.to_string()));
                continue;
            }
        }

        if domain.is_empty() {
            if let Some(id) = row.mapping_id {
                deletes.push((index, Operation::Delete { id }));
            }
            continue;
        }

        if !is_valid_hostname(&domain) {
            errors.insert(index, RowError::new("Invalid domain name", row.domain.clone()));
            continue;
        }
        if seen_domains.contains(&domain) {
            errors.insert(index, RowError::new("Domain is already used by an earlier row", row.domain.clone()));
            continue;
        }
        if seen_sites.contains(&row.site_id) {
            errors.insert(
                index,
                RowError::new("Site already has a domain in an earlier row", row.site_id.to_string()),
            );
            continue;
        }
        if let Some(page_id) = row.default_page_id {
            if seen_pages.contains(&page_id) {
                errors.insert(
                    index,
                    RowError::new("Default page is already used by an earlier row", page_id.to_string()),
                );
                continue;
            }
            seen_pages.insert(page_id);
        }
        seen_domains.insert(domain.clone());
        seen_sites.insert(row.site_id);

        let mapping = NewMapping {
            site_id: row.site_id,
            domain,
            default_page_id: row.default_page_id,
        };
        match row.mapping_id {
            Some(id) => updates.push((index, id, mapping)),
            None => inserts.push((index, Operation::Insert { mapping })),
        }
    }

    let (ordered, cyclic) = order_updates(updates, current);

    let mut operations = deletes;
    operations.extend(
        cyclic
            .iter()
            .map(|(index, id, _)| (*index, Operation::Release { id: *id })),
    );
    operations.extend(
        ordered
            .into_iter()
            .map(|(index, id, mapping)| (index, Operation::Update { id, mapping })),
    );

    let mut claims: Vec<(usize, Operation)> = cyclic
        .into_iter()
        .map(|(index, _, mapping)| (index, Operation::Insert { mapping }))
        .chain(inserts)
        .collect();
    claims.sort_by_key(|(index, _)| *index);
    operations.extend(claims);

    ReconcilePlan { operations, errors }
}

type PendingUpdate = (usize, MappingId, NewMapping);

/// Order updates so that a mapping releasing a value commits before another
/// update claims it. Ties keep submission order.
///
/// Returns the ordered updates and, separately, the updates that are part of
/// (or wait on) a cycle.
fn order_updates(
    updates: Vec<PendingUpdate>,
    current: &BTreeMap<MappingId, DomainMapping>,
) -> (Vec<PendingUpdate>, Vec<PendingUpdate>) {
    let count = updates.len();
    // blockers[i] = updates that must commit before update i
    let mut blockers: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); count];

    for (i, (_, claimer_id, claim)) in updates.iter().enumerate() {
        for (j, (_, holder_id, _)) in updates.iter().enumerate() {
            if i == j || claimer_id == holder_id {
                continue;
            }
            let Some(held) = current.get(holder_id) else {
                continue;
            };
            let conflicts = held.domain == claim.domain
                || held.site_id == claim.site_id
                || (claim.default_page_id.is_some() && held.default_page_id == claim.default_page_id);
            if conflicts {
                blockers[i].insert(j);
            }
        }
    }

    let mut order = Vec::with_capacity(count);
    let mut placed = vec![false; count];
    while let Some(i) = (0..count).find(|&i| !placed[i] && blockers[i].iter().all(|&j| placed[j])) {
        placed[i] = true;
        order.push(i);
    }

    let mut slots: Vec<Option<PendingUpdate>> = updates.into_iter().map(Some).collect();
    let ordered = order.into_iter().filter_map(|i| slots[i].take()).collect();
    let cyclic = slots.into_iter().flatten().collect();
    (ordered, cyclic)
}

/// Applies batches to a mapping store
pub struct MappingReconciler {
    store: Arc<dyn MappingStore>,
}

impl MappingReconciler {
    pub fn new(store: Arc<dyn MappingStore>) -> Self {
        Self { store }
    }

    pub async fn reconcile(&self, rows: &[ReconcileRow]) -> ReconcileReport {
        let mut errors = BTreeMap::new();
        let mut current = BTreeMap::new();

        let referenced: BTreeSet<MappingId> = rows.iter().filter_map(|row| row.mapping_id).collect();
        for id in referenced {
            match self.store.get(id).await {
                Ok(Some(mapping)) => {
                    current.insert(id, mapping);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(mapping_id = %id, error = %e, "Failed to load domain mapping");
                    for (index, _) in rows.iter().enumerate().filter(|(_, r)| r.mapping_id == Some(id)) {
                        errors.insert(index, RowError::new(e.to_string(), id.to_string()));
                    }
                }
            }
        }

        let pending: Vec<ReconcileRow> = rows
            .iter()
            .enumerate()
            .map(|(index, row)| {
                // Rows that failed to load are planned as no-ops
                if errors.contains_key(&index) {
                    ReconcileRow {
                        mapping_id: None,
                        site_id: row.site_id,
                        domain: String::new(),
                        default_page_id: None,
                    }
                } else {
                    row.clone()
                }
            })
            .collect();

        let plan = plan(&pending, &current);
        errors.extend(plan.errors);

        let mut applied = Vec::new();
        for (index, operation) in plan.operations {
            let result = match &operation {
                Operation::Delete { id } => self
                    .store
                    .delete(*id)
                    .await
                    .map(|()| AppliedChange::Deleted { row: index, mapping_id: *id }),
                Operation::Release { id } => self
                    .store
                    .delete(*id)
                    .await
                    .map(|()| AppliedChange::Released { row: index, mapping_id: *id }),
                Operation::Update { id, mapping } => self
                    .store
                    .update(*id, mapping)
                    .await
                    .map(|mapping| AppliedChange::Updated { row: index, mapping }),
                Operation::Insert { mapping } => self
                    .store
                    .insert(mapping)
                    .await
                    .map(|mapping| AppliedChange::Inserted { row: index, mapping }),
            };

            match result {
                Ok(change) => applied.push(change),
                Err(e) => {
                    let value = rows.get(index).map(|row| row.domain.clone()).unwrap_or_default();
                    tracing::warn!(row_index = index, error = %e, "Domain mapping row rejected by store");
                    errors.insert(index, RowError::new(e.to_string(), value));
                }
            }
        }

        tracing::info!(
            rows = rows.len(),
            applied = applied.len(),
            rejected = errors.len(),
            "Domain mappings reconciled"
        );

        ReconcileReport {
            success: errors.is_empty(),
            errors,
            applied,
        }
    }
}
