#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use boxset_core::error::{CatalogError, LookupError};
use boxset_core::ports::{
    CatalogGateway, EntryQuery, ExternalLookupClient, MissingPrimaryQuery,
};
use boxset_core::{InMemoryCatalog, SyncContext};
use boxset_model::{
    CatalogEntry, ChangeKind, CollectionContainer, ContainerHandle,
    EntryHandle, ExternalGroupId, ExternalItem, IdentifierNamespace, Library,
    LibraryId,
};
use tokio::sync::Mutex as AsyncMutex;

pub type ResolveCall = (IdentifierNamespace, Vec<String>);
pub type MembershipCall = (EntryHandle, ContainerHandle, bool);

/// Scripted remote source that records every call it receives.
#[derive(Clone, Default)]
pub struct RecordingLookup {
    mappings: HashMap<(IdentifierNamespace, String), String>,
    groups: HashMap<String, Vec<ExternalItem>>,
    failing: HashSet<IdentifierNamespace>,
    pub resolve_calls: Arc<AsyncMutex<Vec<ResolveCall>>>,
    pub group_calls: Arc<AsyncMutex<Vec<ExternalGroupId>>>,
}

impl RecordingLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map(
        mut self,
        namespace: IdentifierNamespace,
        value: &str,
        primary: &str,
    ) -> Self {
        self.mappings
            .insert((namespace, value.to_string()), primary.to_string());
        self
    }

    pub fn group(mut self, id: &str, items: Vec<ExternalItem>) -> Self {
        self.groups.insert(id.to_string(), items);
        self
    }

    /// Every lookup in `namespace` fails with a rate-limit error.
    pub fn failing(mut self, namespace: IdentifierNamespace) -> Self {
        self.failing.insert(namespace);
        self
    }

    pub async fn calls(&self) -> Vec<ResolveCall> {
        self.resolve_calls.lock().await.clone()
    }
}

#[async_trait]
impl ExternalLookupClient for RecordingLookup {
    async fn resolve_primary_ids(
        &self,
        namespace: IdentifierNamespace,
        values: &[String],
    ) -> Result<HashMap<String, String>, LookupError> {
        self.resolve_calls
            .lock()
            .await
            .push((namespace, values.to_vec()));
        if self.failing.contains(&namespace) {
            return Err(LookupError::RateLimited);
        }
        Ok(values
            .iter()
            .filter_map(|value| {
                self.mappings
                    .get(&(namespace, value.clone()))
                    .map(|primary| (value.clone(), primary.clone()))
            })
            .collect())
    }

    async fn fetch_named_group(
        &self,
        group: &ExternalGroupId,
    ) -> Result<Vec<ExternalItem>, LookupError> {
        self.group_calls.lock().await.push(group.clone());
        Ok(self.groups.get(group.as_str()).cloned().unwrap_or_default())
    }
}

/// Catalog fake backed by [`InMemoryCatalog`] that records mutating calls.
#[derive(Clone, Default)]
pub struct RecordingCatalog {
    pub inner: Arc<InMemoryCatalog>,
    pub query_sizes: Arc<AsyncMutex<Vec<usize>>>,
    pub memberships: Arc<AsyncMutex<Vec<MembershipCall>>>,
    pub persisted: Arc<AsyncMutex<Vec<(EntryHandle, ChangeKind)>>>,
    pub created: Arc<AsyncMutex<Vec<String>>>,
    failing_libraries: Arc<AsyncMutex<HashSet<LibraryId>>>,
    failing_persists: Arc<AsyncMutex<HashSet<EntryHandle>>>,
    failing_creates: Arc<AsyncMutex<HashSet<String>>>,
    failing_memberships: Arc<AsyncMutex<HashSet<EntryHandle>>>,
    members_elsewhere: Arc<AsyncMutex<HashSet<EntryHandle>>>,
}

impl RecordingCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fail_queries_for(&self, library: LibraryId) {
        self.failing_libraries.lock().await.insert(library);
    }

    pub async fn fail_persist_for(&self, entry: EntryHandle) {
        self.failing_persists.lock().await.insert(entry);
    }

    pub async fn fail_create_for(&self, name: &str) {
        self.failing_creates.lock().await.insert(name.to_string());
    }

    pub async fn fail_membership_for(&self, entry: EntryHandle) {
        self.failing_memberships.lock().await.insert(entry);
    }

    /// `add_membership` answers `false` for `entry`, as if another writer
    /// had already recorded it, and leaves the stored catalog alone.
    pub async fn member_elsewhere(&self, entry: EntryHandle) {
        self.members_elsewhere.lock().await.insert(entry);
    }

    pub async fn touched(&self) -> usize {
        self.memberships.lock().await.len()
            + self.persisted.lock().await.len()
            + self.created.lock().await.len()
    }
}

#[async_trait]
impl CatalogGateway for RecordingCatalog {
    async fn list_libraries(&self) -> Result<Vec<Library>, CatalogError> {
        self.inner.list_libraries().await
    }

    async fn query_missing_primary(
        &self,
        query: &MissingPrimaryQuery,
    ) -> Result<Vec<CatalogEntry>, CatalogError> {
        self.inner.query_missing_primary(query).await
    }

    async fn query_by_any_identifier(
        &self,
        query: &EntryQuery,
    ) -> Result<Vec<CatalogEntry>, CatalogError> {
        self.query_sizes.lock().await.push(query.keys.len());
        if self.failing_libraries.lock().await.contains(&query.library_id) {
            return Err(CatalogError::Storage("library offline".into()));
        }
        self.inner.query_by_any_identifier(query).await
    }

    async fn query_containers_by_name(
        &self,
        name: &str,
    ) -> Result<Vec<CollectionContainer>, CatalogError> {
        self.inner.query_containers_by_name(name).await
    }

    async fn ensure_root_collections_container(
        &self,
    ) -> Result<CollectionContainer, CatalogError> {
        self.inner.ensure_root_collections_container().await
    }

    async fn create_collection_container(
        &self,
        name: &str,
        parent: ContainerHandle,
        initial_members: &[EntryHandle],
    ) -> Result<CollectionContainer, CatalogError> {
        if self.failing_creates.lock().await.contains(name) {
            return Err(CatalogError::Storage("container rejected".into()));
        }
        self.created.lock().await.push(name.to_string());
        self.inner
            .create_collection_container(name, parent, initial_members)
            .await
    }

    async fn add_membership(
        &self,
        entry: EntryHandle,
        container: ContainerHandle,
    ) -> Result<bool, CatalogError> {
        if self.failing_memberships.lock().await.contains(&entry) {
            return Err(CatalogError::Conflict("membership locked".into()));
        }
        if self.members_elsewhere.lock().await.contains(&entry) {
            self.memberships.lock().await.push((entry, container, false));
            return Ok(false);
        }
        let added = self.inner.add_membership(entry, container).await?;
        self.memberships.lock().await.push((entry, container, added));
        Ok(added)
    }

    async fn persist(
        &self,
        entry: &CatalogEntry,
        change: ChangeKind,
    ) -> Result<(), CatalogError> {
        if self.failing_persists.lock().await.contains(&entry.handle) {
            return Err(CatalogError::Storage("write rejected".into()));
        }
        self.persisted.lock().await.push((entry.handle, change));
        self.inner.persist(entry, change).await
    }
}

pub fn context(
    lookup: &RecordingLookup,
    catalog: &RecordingCatalog,
) -> SyncContext {
    SyncContext::new(Arc::new(lookup.clone()), Arc::new(catalog.clone()))
}

pub fn item(name: &str, ids: &[(IdentifierNamespace, &str)]) -> ExternalItem {
    ids.iter().fold(ExternalItem::new(name), |item, (namespace, value)| {
        item.with_identifier(*namespace, value)
    })
}
