use async_trait::async_trait;
use boxset_model::{
    CatalogEntry, ChangeKind, CollectionContainer, ContainerHandle,
    EntryHandle, EntryKinds, IdentifierKey, Library, LibraryId,
};

use crate::error::CatalogError;

/// OR-query over identifiers, restricted to one library scope.
///
/// An entry matches when any of its identifiers equals any key in `keys`.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryQuery {
    pub keys: Vec<IdentifierKey>,
    pub library_id: LibraryId,
    pub kinds: EntryKinds,
    /// Skip entries without a filesystem path.
    pub require_path: bool,
    /// Skip virtual placeholder entries.
    pub exclude_virtual: bool,
}

impl EntryQuery {
    /// Query for materialized entries only, the default for collection sync.
    pub fn materialized(
        keys: Vec<IdentifierKey>,
        library_id: LibraryId,
        kinds: EntryKinds,
    ) -> Self {
        Self {
            keys,
            library_id,
            kinds,
            require_path: true,
            exclude_virtual: true,
        }
    }
}

/// Entries lacking a primary id but carrying at least one secondary id.
#[derive(Debug, Clone, PartialEq)]
pub struct MissingPrimaryQuery {
    pub kinds: EntryKinds,
    /// Restrict to these libraries; empty means every library.
    pub libraries: Vec<LibraryId>,
}

/// Repository port for the local catalog store.
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    async fn list_libraries(&self) -> Result<Vec<Library>, CatalogError>;

    async fn query_missing_primary(
        &self,
        query: &MissingPrimaryQuery,
    ) -> Result<Vec<CatalogEntry>, CatalogError>;

    async fn query_by_any_identifier(
        &self,
        query: &EntryQuery,
    ) -> Result<Vec<CatalogEntry>, CatalogError>;

    /// Collection containers whose name equals `name` exactly. Only direct
    /// children of the root collections folder are considered.
    async fn query_containers_by_name(
        &self,
        name: &str,
    ) -> Result<Vec<CollectionContainer>, CatalogError>;

    /// Get-or-create the root folder that parents collection containers.
    async fn ensure_root_collections_container(
        &self,
    ) -> Result<CollectionContainer, CatalogError>;

    async fn create_collection_container(
        &self,
        name: &str,
        parent: ContainerHandle,
        initial_members: &[EntryHandle],
    ) -> Result<CollectionContainer, CatalogError>;

    /// Returns `false` when the entry already belongs to the container.
    async fn add_membership(
        &self,
        entry: EntryHandle,
        container: ContainerHandle,
    ) -> Result<bool, CatalogError>;

    async fn persist(
        &self,
        entry: &CatalogEntry,
        change: ChangeKind,
    ) -> Result<(), CatalogError>;
}
