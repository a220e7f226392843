//! Collection synchronization: resolve a remote group to catalog entries and
//! converge a named collection container onto that membership.

pub mod plan;
pub mod synchronizer;

pub use plan::{CollectionPlan, Materialization, ScopeFilter};
pub use synchronizer::{
    CollectionReport, CollectionSynchronizer, ScopeOutcome, ScopeReport,
};
