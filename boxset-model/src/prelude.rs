//! Convenience imports for crates that work with the catalog model.

pub use crate::collection::{CollectionContainer, ROOT_COLLECTIONS_NAME};
pub use crate::entry::{CatalogEntry, ChangeKind, EntryKind, EntryKinds};
pub use crate::external::{ExternalGroupId, ExternalItem};
pub use crate::identifiers::{
    IdentifierKey, IdentifierNamespace, IdentifierSet,
};
pub use crate::ids::{ContainerHandle, EntryHandle, LibraryId};
pub use crate::library::{Library, LibraryKind};
