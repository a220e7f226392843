use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::collections::{CollectionPlan, CollectionSynchronizer};
use crate::context::SyncContext;
use crate::error::{Result, SyncError};
use crate::guard::TaskKind;

use super::progress::ProgressTracker;
use super::{INITIAL_PROGRESS, RunSummary, TaskBody};

/// Synchronizes one configured collection.
#[derive(Debug, Clone)]
pub struct CollectionSyncBody {
    context: SyncContext,
    plan: CollectionPlan,
}

impl CollectionSyncBody {
    pub fn new(context: SyncContext, plan: CollectionPlan) -> Self {
        Self { context, plan }
    }

    pub fn plan(&self) -> &CollectionPlan {
        &self.plan
    }
}

#[async_trait]
impl TaskBody for CollectionSyncBody {
    fn kind(&self) -> &TaskKind {
        &self.plan.kind
    }

    async fn execute(
        &self,
        cancel: &CancellationToken,
        progress: &mut ProgressTracker<'_>,
    ) -> Result<RunSummary> {
        let items = self
            .context
            .lookup
            .fetch_named_group(&self.plan.group)
            .await?;
        if items.is_empty() {
            return Err(SyncError::EmptyExternalGroup {
                group: self.plan.group.clone(),
            });
        }
        info!(
            target: "boxset::task",
            task = %self.plan.kind,
            group = %self.plan.group,
            items = items.len(),
            "fetched external group"
        );
        progress.advance_to(INITIAL_PROGRESS);
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        let synchronizer = CollectionSynchronizer::new(self.context.clone());
        let scopes = synchronizer.scopes(&self.plan).await?;
        let per_scope = (100.0 - INITIAL_PROGRESS) / scopes.len().max(1) as f64;
        let report = synchronizer
            .synchronize(&self.plan, &items, &scopes, cancel, |done, _total| {
                progress.advance_to(INITIAL_PROGRESS + per_scope * done as f64);
            })
            .await?;
        Ok(RunSummary::Collection(report))
    }
}
