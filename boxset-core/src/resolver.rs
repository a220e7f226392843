//! Fills in missing primary identifiers from secondary ones.
//!
//! Resolution is a waterfall over [`IdentifierNamespace::SECONDARY_PRIORITY`].
//! An entry joins the phase of the first secondary namespace it carries and is
//! never re-queried in a later phase, whether or not its lookup succeeded.
//! When two namespaces would map to different primary ids the first phase
//! wins; the conflict is not detected.

use std::collections::{BTreeMap, HashMap};

use boxset_model::{
    CatalogEntry, ChangeKind, IdentifierKey, IdentifierNamespace,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::context::SyncContext;
use crate::error::{Result, SyncError};
use crate::matching::chunked;

/// Counters describing one resolver pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionReport {
    /// Entries handed to the resolver that were eligible for lookup.
    pub attempted: usize,
    /// Entries updated and persisted, keyed by the namespace that resolved
    /// them.
    pub resolved: BTreeMap<IdentifierNamespace, usize>,
    /// Entries left without a primary id.
    pub unresolved: usize,
    /// Remote calls that failed. Each failure ends its phase early.
    pub lookup_failures: usize,
    /// Entries that resolved but could not be written back.
    pub persist_failures: usize,
}

impl ResolutionReport {
    pub fn resolved_total(&self) -> usize {
        self.resolved.values().sum()
    }

    pub fn resolved_via(&self, namespace: IdentifierNamespace) -> usize {
        self.resolved.get(&namespace).copied().unwrap_or(0)
    }
}

/// Resolves primary ids for a batch of catalog entries.
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    context: SyncContext,
}

impl IdentityResolver {
    pub fn new(context: SyncContext) -> Self {
        Self { context }
    }

    /// Resolve and persist primary ids for `entries`.
    ///
    /// `on_phase` runs after each namespace phase completes. Cancellation is
    /// honoured between phases only; a cancelled run keeps whatever the
    /// finished phases already persisted.
    pub async fn resolve<F>(
        &self,
        entries: Vec<CatalogEntry>,
        cancel: &CancellationToken,
        mut on_phase: F,
    ) -> Result<ResolutionReport>
    where
        F: FnMut(IdentifierNamespace, &ResolutionReport) + Send,
    {
        let mut report = ResolutionReport::default();
        let mut pending: Vec<CatalogEntry> = entries
            .into_iter()
            .filter(|entry| {
                let eligible = !entry.identifiers.has_primary()
                    && entry.identifiers.has_any_secondary();
                if !eligible {
                    debug!(
                        target: "boxset::resolver",
                        entry = %entry.handle,
                        name = %entry.name,
                        "skipping entry without a lookup-eligible id"
                    );
                }
                eligible
            })
            .collect();
        report.attempted = pending.len();

        for (index, namespace) in
            IdentifierNamespace::SECONDARY_PRIORITY.into_iter().enumerate()
        {
            if index > 0 && cancel.is_cancelled() {
                info!(
                    target: "boxset::resolver",
                    next_phase = %namespace,
                    "resolution cancelled between phases"
                );
                return Err(SyncError::Cancelled);
            }

            let (phase, rest): (Vec<_>, Vec<_>) = pending
                .into_iter()
                .partition(|entry| entry.identifiers.contains(namespace));
            pending = rest;

            if !phase.is_empty() {
                self.run_phase(namespace, phase, &mut report).await;
            }
            on_phase(namespace, &report);
        }

        report.unresolved = report.attempted - report.resolved_total();
        info!(
            target: "boxset::resolver",
            attempted = report.attempted,
            resolved = report.resolved_total(),
            unresolved = report.unresolved,
            lookup_failures = report.lookup_failures,
            persist_failures = report.persist_failures,
            "primary id resolution finished"
        );
        Ok(report)
    }

    async fn run_phase(
        &self,
        namespace: IdentifierNamespace,
        mut phase: Vec<CatalogEntry>,
        report: &mut ResolutionReport,
    ) {
        // Several entries can share one secondary value (the same film in two
        // libraries); each value is sent once.
        let mut values: Vec<String> = Vec::new();
        let mut by_value: HashMap<String, Vec<usize>> = HashMap::new();
        for (position, entry) in phase.iter().enumerate() {
            if let Some(value) = entry.identifier(namespace) {
                let slots = by_value.entry(value.to_string()).or_default();
                if slots.is_empty() {
                    values.push(value.to_string());
                }
                slots.push(position);
            }
        }

        let mut mapping: HashMap<String, String> = HashMap::new();
        for chunk in chunked(&values, self.context.batch_size()) {
            let lookup = self.context.lookup.as_ref();
            match lookup.resolve_primary_ids(namespace, chunk).await {
                Ok(found) => {
                    debug!(
                        target: "boxset::resolver",
                        %namespace,
                        requested = chunk.len(),
                        found = found.len(),
                        "lookup chunk completed"
                    );
                    mapping.extend(found);
                }
                Err(err) => {
                    report.lookup_failures += 1;
                    warn!(
                        target: "boxset::resolver",
                        %namespace,
                        chunk_size = chunk.len(),
                        entries = phase.len(),
                        error = %err,
                        "lookup failed; rest of this phase stays unresolved"
                    );
                    break;
                }
            }
        }

        for value in &values {
            let (Some(primary), Some(positions)) =
                (mapping.get(value), by_value.get(value))
            else {
                continue;
            };
            let Ok(key) = IdentifierKey::primary(primary) else {
                warn!(
                    target: "boxset::resolver",
                    %namespace,
                    %value,
                    "remote source returned a blank primary id"
                );
                continue;
            };
            for &position in positions {
                let entry = &mut phase[position];
                entry.set_identifier(key.clone());
                entry.touch();
                match self
                    .context
                    .catalog
                    .persist(entry, ChangeKind::MetadataEdit)
                    .await
                {
                    Ok(()) => {
                        *report.resolved.entry(namespace).or_default() += 1;
                        debug!(
                            target: "boxset::resolver",
                            entry = %entry.handle,
                            name = %entry.name,
                            %namespace,
                            primary = %key.value,
                            "primary id filled"
                        );
                    }
                    Err(err) => {
                        report.persist_failures += 1;
                        warn!(
                            target: "boxset::resolver",
                            entry = %entry.handle,
                            name = %entry.name,
                            error = %err,
                            "failed to persist resolved primary id"
                        );
                    }
                }
            }
        }

        info!(
            target: "boxset::resolver",
            %namespace,
            entries = phase.len(),
            distinct_values = values.len(),
            resolved = report.resolved_via(namespace),
            "resolution phase finished"
        );
    }
}
