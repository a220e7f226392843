use std::collections::HashSet;

use boxset_model::{
    CatalogEntry, ChangeKind, CollectionContainer, EntryHandle, ExternalItem,
    IdentifierKey, Library,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::context::SyncContext;
use crate::error::{Result, SyncError};
use crate::matching::{chunked, group_or_set};
use crate::ports::EntryQuery;

use super::plan::{CollectionPlan, Materialization};

/// What happened to one container during reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeOutcome {
    /// A new container was created with `members` initial entries.
    Created { members: usize },
    /// An existing container was topped up.
    Updated { added: usize, already_members: usize },
    /// No catalog entry matched; nothing was touched.
    NoCandidates,
    /// Several containers share the target name; left alone.
    Ambiguous { matches: usize },
    /// A catalog call failed; mutations made before the failure are kept.
    Failed(String),
}

/// Outcome for one container (one library, or the merged pool).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeReport {
    /// Library the container belongs to; `None` for a merged collection.
    pub library: Option<String>,
    pub collection: String,
    pub outcome: ScopeOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionReport {
    pub external_items: usize,
    pub scopes: Vec<ScopeReport>,
}

impl CollectionReport {
    pub fn added_total(&self) -> usize {
        self.scopes
            .iter()
            .map(|scope| match scope.outcome {
                ScopeOutcome::Created { members } => members,
                ScopeOutcome::Updated { added, .. } => added,
                _ => 0,
            })
            .sum()
    }

    pub fn failed_scopes(&self) -> usize {
        self.scopes
            .iter()
            .filter(|scope| matches!(scope.outcome, ScopeOutcome::Failed(_)))
            .count()
    }
}

/// Reconciles a persisted collection container against a remote group.
#[derive(Debug, Clone)]
pub struct CollectionSynchronizer {
    context: SyncContext,
}

impl CollectionSynchronizer {
    pub fn new(context: SyncContext) -> Self {
        Self { context }
    }

    /// Libraries the plan applies to, in catalog order.
    pub async fn scopes(&self, plan: &CollectionPlan) -> Result<Vec<Library>> {
        let libraries = self.context.catalog.list_libraries().await?;
        Ok(libraries
            .into_iter()
            .filter(|library| plan.scope_filter.admits(library, plan.kinds))
            .collect())
    }

    /// Bring the plan's container(s) in line with `items`.
    ///
    /// `scopes` are processed one at a time. `on_scope(done, total)` runs after
    /// each library, and cancellation is checked right after it. Merged plans
    /// check once more before their single reconcile. A cancelled run keeps
    /// every container already reconciled.
    pub async fn synchronize<F>(
        &self,
        plan: &CollectionPlan,
        items: &[ExternalItem],
        scopes: &[Library],
        cancel: &CancellationToken,
        mut on_scope: F,
    ) -> Result<CollectionReport>
    where
        F: FnMut(usize, usize) + Send,
    {
        if items.is_empty() {
            return Err(SyncError::EmptyExternalGroup {
                group: plan.group.clone(),
            });
        }

        let keys = group_or_set(items);
        let mut report = CollectionReport {
            external_items: items.len(),
            scopes: Vec::new(),
        };
        if scopes.is_empty() {
            warn!(
                target: "boxset::collections",
                collection = %plan.name,
                "no library matches the collection scope"
            );
            return Ok(report);
        }

        let total = scopes.len();
        let mut merged: Vec<CatalogEntry> = Vec::new();
        let mut merged_seen: HashSet<EntryHandle> = HashSet::new();

        for (index, library) in scopes.iter().enumerate() {
            let candidates = match self.candidates(plan, library, &keys).await {
                Ok(candidates) => candidates,
                Err(err) => {
                    error!(
                        target: "boxset::collections",
                        collection = %plan.name,
                        library = %library.name,
                        error = %err,
                        "catalog query failed; skipping library"
                    );
                    report.scopes.push(ScopeReport {
                        library: Some(library.name.clone()),
                        collection: plan.container_name(Some(library)),
                        outcome: ScopeOutcome::Failed(err.to_string()),
                    });
                    on_scope(index + 1, total);
                    self.check_cancelled(cancel, index + 1, total)?;
                    continue;
                }
            };

            match plan.materialization {
                Materialization::PerLibrary => {
                    let name = plan.container_name(Some(library));
                    let outcome =
                        self.reconcile_logged(&name, candidates).await;
                    report.scopes.push(ScopeReport {
                        library: Some(library.name.clone()),
                        collection: name,
                        outcome,
                    });
                }
                Materialization::Merged => {
                    merged.extend(
                        candidates
                            .into_iter()
                            .filter(|entry| merged_seen.insert(entry.handle)),
                    );
                }
            }

            on_scope(index + 1, total);
            self.check_cancelled(cancel, index + 1, total)?;
        }

        if plan.materialization == Materialization::Merged {
            if cancel.is_cancelled() {
                info!(
                    target: "boxset::collections",
                    collection = %plan.name,
                    "collection sync cancelled before the merged reconcile"
                );
                return Err(SyncError::Cancelled);
            }
            let name = plan.container_name(None);
            let outcome = self.reconcile_logged(&name, merged).await;
            report.scopes.push(ScopeReport {
                library: None,
                collection: name,
                outcome,
            });
        }

        info!(
            target: "boxset::collections",
            collection = %plan.name,
            group = %plan.group,
            external_items = report.external_items,
            containers = report.scopes.len(),
            added = report.added_total(),
            failed = report.failed_scopes(),
            "collection synchronized"
        );
        Ok(report)
    }

    fn check_cancelled(
        &self,
        cancel: &CancellationToken,
        done: usize,
        total: usize,
    ) -> Result<()> {
        if cancel.is_cancelled() && done < total {
            info!(
                target: "boxset::collections",
                done,
                total,
                "collection sync cancelled between libraries"
            );
            return Err(SyncError::Cancelled);
        }
        Ok(())
    }

    /// Materialized entries of `library` matching any key, de-duplicated.
    async fn candidates(
        &self,
        plan: &CollectionPlan,
        library: &Library,
        keys: &[IdentifierKey],
    ) -> Result<Vec<CatalogEntry>> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for chunk in chunked(keys, self.context.batch_size()) {
            let query = EntryQuery::materialized(
                chunk.to_vec(),
                library.id,
                plan.kinds,
            );
            let found =
                self.context.catalog.query_by_any_identifier(&query).await?;
            candidates.extend(
                found.into_iter().filter(|entry| seen.insert(entry.handle)),
            );
        }
        debug!(
            target: "boxset::collections",
            library = %library.name,
            keys = keys.len(),
            candidates = candidates.len(),
            "resolved catalog candidates"
        );
        Ok(candidates)
    }

    async fn reconcile_logged(
        &self,
        name: &str,
        candidates: Vec<CatalogEntry>,
    ) -> ScopeOutcome {
        match self.reconcile(name, candidates).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(
                    target: "boxset::collections",
                    collection = %name,
                    error = %err,
                    "collection reconciliation failed"
                );
                ScopeOutcome::Failed(err.to_string())
            }
        }
    }

    async fn reconcile(
        &self,
        name: &str,
        mut candidates: Vec<CatalogEntry>,
    ) -> Result<ScopeOutcome> {
        if candidates.is_empty() {
            debug!(
                target: "boxset::collections",
                collection = %name,
                "no catalog entries matched"
            );
            return Ok(ScopeOutcome::NoCandidates);
        }

        let mut existing =
            self.context.catalog.query_containers_by_name(name).await?;
        match existing.len() {
            0 => self.create(name, &candidates).await,
            1 => {
                let container = existing.remove(0);
                self.top_up(&container, &mut candidates).await
            }
            count => {
                let err = SyncError::AmbiguousCollectionName {
                    name: name.to_string(),
                    count,
                };
                warn!(
                    target: "boxset::collections",
                    collection = %name,
                    matches = count,
                    "{err}; leaving it untouched"
                );
                Ok(ScopeOutcome::Ambiguous { matches: count })
            }
        }
    }

    async fn create(
        &self,
        name: &str,
        candidates: &[CatalogEntry],
    ) -> Result<ScopeOutcome> {
        let root =
            self.context.catalog.ensure_root_collections_container().await?;
        let members: Vec<EntryHandle> =
            candidates.iter().map(|entry| entry.handle).collect();
        let container = self
            .context
            .catalog
            .create_collection_container(name, root.handle, &members)
            .await?;
        info!(
            target: "boxset::collections",
            collection = %name,
            container = %container.handle,
            members = members.len(),
            "created collection"
        );
        Ok(ScopeOutcome::Created {
            members: members.len(),
        })
    }

    async fn top_up(
        &self,
        container: &CollectionContainer,
        candidates: &mut [CatalogEntry],
    ) -> Result<ScopeOutcome> {
        let mut added = 0;
        let mut already_members = 0;
        for entry in candidates.iter_mut() {
            let listed = container.contains(entry.handle);
            let tagged = entry.is_member_of(container.handle);
            if listed && tagged {
                already_members += 1;
                continue;
            }
            if listed {
                // Only the entry side is missing; restore it without asking
                // the catalog to add the membership again.
                entry.add_collection(container.handle);
                entry.touch();
                self.context
                    .catalog
                    .persist(entry, ChangeKind::MembershipUpdate)
                    .await?;
                already_members += 1;
                debug!(
                    target: "boxset::collections",
                    collection = %container.name,
                    entry = %entry.handle,
                    name = %entry.name,
                    "restored entry-side membership"
                );
                continue;
            }
            if !self
                .context
                .catalog
                .add_membership(entry.handle, container.handle)
                .await?
            {
                already_members += 1;
                continue;
            }
            entry.add_collection(container.handle);
            entry.touch();
            self.context
                .catalog
                .persist(entry, ChangeKind::MembershipUpdate)
                .await?;
            added += 1;
            debug!(
                target: "boxset::collections",
                collection = %container.name,
                entry = %entry.handle,
                name = %entry.name,
                "added entry to collection"
            );
        }
        info!(
            target: "boxset::collections",
            collection = %container.name,
            added,
            already_members,
            "updated collection"
        );
        Ok(ScopeOutcome::Updated {
            added,
            already_members,
        })
    }
}
