//! Ports (interfaces) for the two collaborators the reconciler talks to.
//!
//! The remote metadata source sits behind [`ExternalLookupClient`]; the local
//! catalog store sits behind [`CatalogGateway`]. Adapters live under
//! `providers` and `catalog`.

pub mod catalog;
pub mod lookup;

pub use catalog::{CatalogGateway, EntryQuery, MissingPrimaryQuery};
pub use lookup::ExternalLookupClient;
