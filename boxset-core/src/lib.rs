//! Boxset core: keeps a local media catalog consistent with a remote
//! metadata source.
//!
//! Two reconciliation jobs are provided:
//!
//! - [`IdentityResolver`] backfills missing primary identifiers by
//!   translating secondary ones (Imdb, then Tmdb) in bounded batches.
//! - [`CollectionSynchronizer`] turns a remote named group into a collection
//!   container, creating it on first run and topping it up afterwards.
//!
//! Both are wrapped in [`SyncTask`]s that hold a per-kind [`RunPermit`] from a
//! shared [`SingleRunGuard`], report monotonic progress and honor
//! cooperative cancellation.
//!
//! The remote source and the catalog store sit behind the
//! [`ExternalLookupClient`] and [`CatalogGateway`] ports.
#![allow(missing_docs)]

pub mod catalog;
pub mod collections;
pub mod config;
pub mod context;
pub mod error;
pub mod guard;
pub mod matching;
pub mod ports;
pub mod providers;
pub mod resolver;
pub mod task;

pub use catalog::{CatalogSnapshot, InMemoryCatalog};
pub use collections::{
    CollectionPlan, CollectionReport, CollectionSynchronizer, Materialization,
    ScopeFilter, ScopeOutcome, ScopeReport,
};
pub use config::{
    CollectionDefinition, FillPrimaryIdsConfig, LookupConfig, SyncConfig,
};
pub use context::SyncContext;
pub use error::{CatalogError, LookupError, Result, SkipReason, SyncError};
pub use guard::{RunPermit, SingleRunGuard, TaskKind};
pub use ports::{
    CatalogGateway, EntryQuery, ExternalLookupClient, MissingPrimaryQuery,
};
pub use providers::HttpLookupClient;
pub use resolver::{IdentityResolver, ResolutionReport};
pub use task::{
    CollectionSyncBody, FillPrimaryIdsBody, NoopProgress, ProgressSink,
    ProgressTracker, RunOutcome, RunSummary, SyncTask, TaskBody, TaskState,
    build_tasks,
};
