//! Core data model definitions shared across Boxset crates.
#![allow(missing_docs)]

pub mod collection;
pub mod entry;
pub mod error;
pub mod external;
pub mod identifiers;
pub mod ids;
pub mod library;
pub mod prelude;

// Intentionally curated re-exports for downstream consumers.
pub use collection::{CollectionContainer, ROOT_COLLECTIONS_NAME};
pub use entry::{CatalogEntry, ChangeKind, EntryKind, EntryKinds};
pub use error::{ModelError, Result as ModelResult};
pub use external::{ExternalGroupId, ExternalItem};
pub use identifiers::{IdentifierKey, IdentifierNamespace, IdentifierSet};
pub use ids::{ContainerHandle, EntryHandle, LibraryId};
pub use library::{Library, LibraryKind};
