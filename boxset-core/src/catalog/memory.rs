use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use boxset_model::{
    CatalogEntry, ChangeKind, CollectionContainer, ContainerHandle,
    EntryHandle, Library, LibraryId, ROOT_COLLECTIONS_NAME,
};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::CatalogError;
use crate::ports::{CatalogGateway, EntryQuery, MissingPrimaryQuery};

/// Serializable image of an [`InMemoryCatalog`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSnapshot {
    pub libraries: Vec<Library>,
    pub entries: Vec<CatalogEntry>,
    pub containers: Vec<CollectionContainer>,
}

#[derive(Debug, Default)]
struct CatalogState {
    libraries: Vec<Library>,
    entries: Vec<CatalogEntry>,
    containers: Vec<CollectionContainer>,
}

impl CatalogState {
    fn entry_mut(
        &mut self,
        handle: EntryHandle,
    ) -> Result<&mut CatalogEntry, CatalogError> {
        self.entries
            .iter_mut()
            .find(|entry| entry.handle == handle)
            .ok_or_else(|| CatalogError::NotFound(format!("entry {handle}")))
    }

    fn container_mut(
        &mut self,
        handle: ContainerHandle,
    ) -> Result<&mut CollectionContainer, CatalogError> {
        self.containers
            .iter_mut()
            .find(|container| container.handle == handle)
            .ok_or_else(|| {
                CatalogError::NotFound(format!("container {handle}"))
            })
    }

    fn root(&self) -> Option<&CollectionContainer> {
        self.containers
            .iter()
            .find(|c| c.is_root() && c.name == ROOT_COLLECTIONS_NAME)
    }
}

/// Catalog store kept in memory, optionally backed by a JSON snapshot file.
///
/// Used by the CLI for offline runs and by the test suites.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    state: RwLock<CatalogState>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: CatalogSnapshot) -> Self {
        Self {
            state: RwLock::new(CatalogState {
                libraries: snapshot.libraries,
                entries: snapshot.entries,
                containers: snapshot.containers,
            }),
        }
    }

    pub async fn snapshot(&self) -> CatalogSnapshot {
        let state = self.state.read().await;
        CatalogSnapshot {
            libraries: state.libraries.clone(),
            entries: state.entries.clone(),
            containers: state.containers.clone(),
        }
    }

    /// Read a snapshot file. A missing file yields an empty catalog.
    pub async fn load(path: &Path) -> Result<Self, CatalogError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(
                    target: "boxset::catalog",
                    path = %path.display(),
                    "no snapshot; starting empty"
                );
                return Ok(Self::new());
            }
            Err(err) => return Err(err.into()),
        };
        let snapshot: CatalogSnapshot = serde_json::from_slice(&bytes)?;
        Ok(Self::from_snapshot(snapshot))
    }

    /// Write the current state to `path` via a temp file and rename.
    pub async fn save(&self, path: &Path) -> Result<(), CatalogError> {
        let snapshot = self.snapshot().await;
        let bytes = serde_json::to_vec_pretty(&snapshot)?;

        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("catalog.json");
        let tmp = path.with_file_name(format!(
            ".{file_name}.tmp-{}",
            Uuid::new_v4().simple()
        ));

        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        drop(file);

        if let Err(err) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(err.into());
        }
        debug!(
            target: "boxset::catalog",
            path = %path.display(),
            entries = snapshot.entries.len(),
            containers = snapshot.containers.len(),
            "snapshot saved"
        );
        Ok(())
    }

    pub async fn add_library(&self, library: Library) -> LibraryId {
        let id = library.id;
        self.state.write().await.libraries.push(library);
        id
    }

    pub async fn add_entry(&self, entry: CatalogEntry) -> EntryHandle {
        let handle = entry.handle;
        self.state.write().await.entries.push(entry);
        handle
    }

    pub async fn add_container(
        &self,
        container: CollectionContainer,
    ) -> ContainerHandle {
        let handle = container.handle;
        self.state.write().await.containers.push(container);
        handle
    }

    pub async fn entry(&self, handle: EntryHandle) -> Option<CatalogEntry> {
        self.state
            .read()
            .await
            .entries
            .iter()
            .find(|entry| entry.handle == handle)
            .cloned()
    }

    pub async fn container(
        &self,
        handle: ContainerHandle,
    ) -> Option<CollectionContainer> {
        self.state
            .read()
            .await
            .containers
            .iter()
            .find(|container| container.handle == handle)
            .cloned()
    }

    /// Every container with this name, wherever it sits in the tree.
    pub async fn containers_named(
        &self,
        name: &str,
    ) -> Vec<CollectionContainer> {
        self.state
            .read()
            .await
            .containers
            .iter()
            .filter(|container| container.name == name)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CatalogGateway for InMemoryCatalog {
    async fn list_libraries(&self) -> Result<Vec<Library>, CatalogError> {
        Ok(self.state.read().await.libraries.clone())
    }

    async fn query_missing_primary(
        &self,
        query: &MissingPrimaryQuery,
    ) -> Result<Vec<CatalogEntry>, CatalogError> {
        let state = self.state.read().await;
        Ok(state
            .entries
            .iter()
            .filter(|entry| query.kinds.contains(entry.kind))
            .filter(|entry| {
                query.libraries.is_empty()
                    || query.libraries.contains(&entry.library_id)
            })
            .filter(|entry| {
                !entry.identifiers.has_primary()
                    && entry.identifiers.has_any_secondary()
            })
            .cloned()
            .collect())
    }

    async fn query_by_any_identifier(
        &self,
        query: &EntryQuery,
    ) -> Result<Vec<CatalogEntry>, CatalogError> {
        if query.keys.is_empty() {
            return Ok(Vec::new());
        }
        let keys: HashSet<_> = query.keys.iter().cloned().collect();
        let state = self.state.read().await;
        Ok(state
            .entries
            .iter()
            .filter(|entry| entry.library_id == query.library_id)
            .filter(|entry| query.kinds.contains(entry.kind))
            .filter(|entry| match (query.require_path, query.exclude_virtual) {
                (true, true) => entry.is_materialized(),
                (true, false) => entry.path.is_some(),
                (false, true) => !entry.is_virtual,
                (false, false) => true,
            })
            .filter(|entry| entry.identifiers.intersects(&keys))
            .cloned()
            .collect())
    }

    async fn query_containers_by_name(
        &self,
        name: &str,
    ) -> Result<Vec<CollectionContainer>, CatalogError> {
        let state = self.state.read().await;
        let Some(root) = state.root().map(|root| root.handle) else {
            return Ok(Vec::new());
        };
        Ok(state
            .containers
            .iter()
            .filter(|c| c.parent == Some(root) && c.name == name)
            .cloned()
            .collect())
    }

    async fn ensure_root_collections_container(
        &self,
    ) -> Result<CollectionContainer, CatalogError> {
        let mut state = self.state.write().await;
        if let Some(root) = state.root() {
            return Ok(root.clone());
        }
        let root =
            CollectionContainer::new(ROOT_COLLECTIONS_NAME, None, Vec::new());
        debug!(
            target: "boxset::catalog",
            root = %root.handle,
            "created root collections container"
        );
        state.containers.push(root.clone());
        Ok(root)
    }

    async fn create_collection_container(
        &self,
        name: &str,
        parent: ContainerHandle,
        initial_members: &[EntryHandle],
    ) -> Result<CollectionContainer, CatalogError> {
        let mut state = self.state.write().await;
        state.container_mut(parent)?;

        let mut members = Vec::with_capacity(initial_members.len());
        let mut seen = HashSet::new();
        for handle in initial_members {
            if !state.entries.iter().any(|entry| entry.handle == *handle) {
                return Err(CatalogError::NotFound(format!("entry {handle}")));
            }
            if seen.insert(*handle) {
                members.push(*handle);
            }
        }

        let container = CollectionContainer::new(name, Some(parent), members);
        for handle in &container.members {
            state.entry_mut(*handle)?.add_collection(container.handle);
        }
        state.containers.push(container.clone());
        Ok(container)
    }

    async fn add_membership(
        &self,
        entry: EntryHandle,
        container: ContainerHandle,
    ) -> Result<bool, CatalogError> {
        let mut state = self.state.write().await;
        let listed = state.container_mut(container)?.contains(entry);
        // The container's member list decides the reply; the entry side is
        // brought in line either way.
        state.entry_mut(entry)?.add_collection(container);
        if listed {
            return Ok(false);
        }
        state.container_mut(container)?.members.push(entry);
        Ok(true)
    }

    async fn persist(
        &self,
        entry: &CatalogEntry,
        change: ChangeKind,
    ) -> Result<(), CatalogError> {
        let mut state = self.state.write().await;
        let stored = state.entry_mut(entry.handle)?;
        // Only the fields owned by `change` are written.
        match change {
            ChangeKind::MetadataEdit => {
                stored.identifiers = entry.identifiers.clone();
            }
            ChangeKind::MembershipUpdate => {
                for container in &entry.collections {
                    stored.add_collection(*container);
                }
            }
        }
        stored.updated_at = stored.updated_at.max(entry.updated_at);
        debug!(
            target: "boxset::catalog",
            entry = %entry.handle,
            ?change,
            "entry persisted"
        );
        Ok(())
    }
}
