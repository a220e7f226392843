use async_trait::async_trait;
use boxset_model::{EntryKinds, IdentifierNamespace};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::context::SyncContext;
use crate::error::{Result, SyncError};
use crate::guard::TaskKind;
use crate::ports::MissingPrimaryQuery;
use crate::resolver::IdentityResolver;

use super::progress::ProgressTracker;
use super::{INITIAL_PROGRESS, RunSummary, TaskBody};

/// Task kind of the primary id backfill.
pub const FILL_PRIMARY_IDS_KIND: &str = "fill-primary-ids";

/// Backfills primary ids for entries that only carry secondary ids.
#[derive(Debug, Clone)]
pub struct FillPrimaryIdsBody {
    kind: TaskKind,
    context: SyncContext,
    kinds: EntryKinds,
    /// Library names to restrict the backfill to; empty means all.
    libraries: Vec<String>,
}

impl FillPrimaryIdsBody {
    pub fn new(
        context: SyncContext,
        kinds: EntryKinds,
        libraries: Vec<String>,
    ) -> Self {
        Self {
            kind: TaskKind::new(FILL_PRIMARY_IDS_KIND),
            context,
            kinds,
            libraries,
        }
    }

    async fn query(&self) -> Result<MissingPrimaryQuery> {
        let mut query = MissingPrimaryQuery {
            kinds: self.kinds,
            libraries: Vec::new(),
        };
        if self.libraries.is_empty() {
            return Ok(query);
        }
        let libraries = self.context.catalog.list_libraries().await?;
        query.libraries = libraries
            .into_iter()
            .filter(|library| {
                self.libraries
                    .iter()
                    .any(|name| name.eq_ignore_ascii_case(&library.name))
            })
            .map(|library| library.id)
            .collect();
        if query.libraries.is_empty() {
            return Err(SyncError::Config(format!(
                "none of the libraries {:?} exist",
                self.libraries
            )));
        }
        Ok(query)
    }
}

#[async_trait]
impl TaskBody for FillPrimaryIdsBody {
    fn kind(&self) -> &TaskKind {
        &self.kind
    }

    async fn execute(
        &self,
        cancel: &CancellationToken,
        progress: &mut ProgressTracker<'_>,
    ) -> Result<RunSummary> {
        let query = self.query().await?;
        let entries = self.context.catalog.query_missing_primary(&query).await?;
        info!(
            target: "boxset::task",
            task = %self.kind,
            candidates = entries.len(),
            "loaded entries missing a primary id"
        );
        progress.advance_to(INITIAL_PROGRESS);
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        let phases = IdentifierNamespace::SECONDARY_PRIORITY.len() as f64;
        let step = (100.0 - INITIAL_PROGRESS) / phases;
        let mut finished = 0.0;
        let report = IdentityResolver::new(self.context.clone())
            .resolve(entries, cancel, |_, _| {
                finished += 1.0;
                progress.advance_to(INITIAL_PROGRESS + step * finished);
            })
            .await?;
        Ok(RunSummary::Resolution(report))
    }
}
