//! Catalog store adapters.

pub mod memory;

pub use memory::{CatalogSnapshot, InMemoryCatalog};
