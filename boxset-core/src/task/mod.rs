//! Task orchestration.
//!
//! A [`SyncTask`] wraps a [`TaskBody`] with the run guard, progress reporting
//! and outcome classification:
//!
//! ```text
//! Idle -> Acquiring -> Running -> Success | Failed -> Idle
//!             \-> SkippedAlreadyRunning -> Idle
//! ```
//!
//! Cancellation is cooperative and only observed at phase boundaries: after
//! the initial fetch, between resolver phases and after each library scope.

pub mod collection;
pub mod fill;
pub mod progress;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::collections::CollectionReport;
use crate::config::SyncConfig;
use crate::context::SyncContext;
use crate::error::{Result, SkipReason, SyncError};
use crate::guard::{SingleRunGuard, TaskKind};
use crate::resolver::ResolutionReport;

pub use collection::CollectionSyncBody;
pub use fill::FillPrimaryIdsBody;
pub use progress::{NoopProgress, ProgressSink, ProgressTracker};

/// Progress reported once the initial fetch of a run has completed.
pub const INITIAL_PROGRESS: f64 = 10.0;

/// Lifecycle states of one task execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Idle,
    Acquiring,
    Running,
    Success,
    SkippedAlreadyRunning,
    Failed,
}

/// What a successful body produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunSummary {
    Resolution(ResolutionReport),
    Collection(CollectionReport),
}

/// Coarse result of [`SyncTask::run`].
#[derive(Debug)]
pub enum RunOutcome {
    Success(RunSummary),
    Skipped(SkipReason),
    Failed(SyncError),
}

impl RunOutcome {
    /// Terminal state this outcome corresponds to.
    pub fn state(&self) -> TaskState {
        match self {
            RunOutcome::Success(_) => TaskState::Success,
            RunOutcome::Skipped(SkipReason::AlreadyRunning) => {
                TaskState::SkippedAlreadyRunning
            }
            RunOutcome::Skipped(_) => TaskState::Success,
            RunOutcome::Failed(_) => TaskState::Failed,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, RunOutcome::Failed(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunOutcome::Failed(err) if err.is_cancelled())
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Success(_) => write!(f, "success"),
            RunOutcome::Skipped(reason) => write!(f, "skipped ({reason})"),
            RunOutcome::Failed(err) => write!(f, "failed ({err})"),
        }
    }
}

/// The work a task performs once it holds its run permit.
#[async_trait]
pub trait TaskBody: Send + Sync {
    fn kind(&self) -> &TaskKind;

    async fn execute(
        &self,
        cancel: &CancellationToken,
        progress: &mut ProgressTracker<'_>,
    ) -> Result<RunSummary>;
}

/// A runnable, guarded synchronization task.
#[derive(Clone)]
pub struct SyncTask {
    guard: Arc<SingleRunGuard>,
    body: Arc<dyn TaskBody>,
}

impl fmt::Debug for SyncTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncTask")
            .field("kind", self.body.kind())
            .field("running", &self.guard.is_running(self.body.kind()))
            .finish()
    }
}

impl SyncTask {
    pub fn new(guard: Arc<SingleRunGuard>, body: Arc<dyn TaskBody>) -> Self {
        Self { guard, body }
    }

    pub fn kind(&self) -> &TaskKind {
        self.body.kind()
    }

    /// Execute the task once, unless another run of the same kind is active.
    ///
    /// The run permit is dropped before this returns, whatever the outcome.
    pub async fn run(
        &self,
        cancel: CancellationToken,
        progress: &dyn ProgressSink,
    ) -> RunOutcome {
        let kind = self.body.kind();
        info!(
            target: "boxset::task",
            task = %kind,
            state = ?TaskState::Acquiring,
            "task triggered"
        );

        let Some(permit) = self.guard.try_acquire(kind) else {
            let busy = SyncError::GuardBusy {
                kind: kind.to_string(),
            };
            info!(
                target: "boxset::task",
                task = %kind,
                state = ?TaskState::SkippedAlreadyRunning,
                "{busy}; skipping"
            );
            return RunOutcome::Skipped(SkipReason::AlreadyRunning);
        };

        info!(
            target: "boxset::task",
            task = %kind,
            state = ?TaskState::Running,
            "task started"
        );
        let mut tracker = ProgressTracker::new(progress);
        let result = self.body.execute(&cancel, &mut tracker).await;
        drop(permit);

        let outcome = match result {
            Ok(summary) => {
                if !cancel.is_cancelled() {
                    tracker.complete();
                }
                RunOutcome::Success(summary)
            }
            Err(err) => match err.skip_reason() {
                Some(reason) => {
                    info!(
                        target: "boxset::task",
                        task = %kind,
                        reason = %err,
                        "nothing to reconcile"
                    );
                    RunOutcome::Skipped(reason)
                }
                None if err.is_cancelled() => {
                    warn!(
                        target: "boxset::task",
                        task = %kind,
                        progress = tracker.current(),
                        "task cancelled; completed work is kept"
                    );
                    RunOutcome::Failed(err)
                }
                None => {
                    error!(
                        target: "boxset::task",
                        task = %kind,
                        progress = tracker.current(),
                        error = %err,
                        "task failed"
                    );
                    RunOutcome::Failed(err)
                }
            },
        };

        info!(
            target: "boxset::task",
            task = %kind,
            state = ?outcome.state(),
            outcome = %outcome,
            "task finished"
        );
        outcome
    }
}

/// Build every task enabled in `config`, sharing one guard.
pub fn build_tasks(
    config: &SyncConfig,
    context: &SyncContext,
    guard: &Arc<SingleRunGuard>,
) -> Vec<SyncTask> {
    let mut tasks = Vec::new();
    if config.fill_primary_ids.enabled {
        let body = FillPrimaryIdsBody::new(
            context.clone(),
            config.fill_primary_ids.kinds,
            config.fill_primary_ids.libraries.clone(),
        );
        tasks.push(SyncTask::new(Arc::clone(guard), Arc::new(body)));
    }
    for definition in &config.collections {
        let body =
            CollectionSyncBody::new(context.clone(), definition.to_plan());
        tasks.push(SyncTask::new(Arc::clone(guard), Arc::new(body)));
    }
    tasks
}
