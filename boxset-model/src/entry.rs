use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::identifiers::{IdentifierKey, IdentifierNamespace, IdentifierSet};
use crate::ids::{ContainerHandle, EntryHandle, LibraryId};

/// Kind of catalog entry a query or collection is concerned with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum EntryKind {
    Movie,
    Series,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::Movie => write!(f, "movie"),
            EntryKind::Series => write!(f, "series"),
        }
    }
}

/// Small set of [`EntryKind`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(into = "Vec<EntryKind>", from = "Vec<EntryKind>")
)]
pub struct EntryKinds {
    movies: bool,
    series: bool,
}

impl Default for EntryKinds {
    fn default() -> Self {
        Self::ALL
    }
}

impl EntryKinds {
    pub const ALL: EntryKinds = EntryKinds {
        movies: true,
        series: true,
    };
    pub const MOVIES: EntryKinds = EntryKinds {
        movies: true,
        series: false,
    };
    pub const SERIES: EntryKinds = EntryKinds {
        movies: false,
        series: true,
    };

    pub fn contains(&self, kind: EntryKind) -> bool {
        match kind {
            EntryKind::Movie => self.movies,
            EntryKind::Series => self.series,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.movies && !self.series
    }

    pub fn iter(&self) -> impl Iterator<Item = EntryKind> + '_ {
        [EntryKind::Movie, EntryKind::Series]
            .into_iter()
            .filter(|kind| self.contains(*kind))
    }
}

impl From<Vec<EntryKind>> for EntryKinds {
    fn from(kinds: Vec<EntryKind>) -> Self {
        kinds.into_iter().collect()
    }
}

impl From<EntryKinds> for Vec<EntryKind> {
    fn from(kinds: EntryKinds) -> Self {
        kinds.iter().collect()
    }
}

impl FromIterator<EntryKind> for EntryKinds {
    fn from_iter<I: IntoIterator<Item = EntryKind>>(iter: I) -> Self {
        let mut kinds = EntryKinds {
            movies: false,
            series: false,
        };
        for kind in iter {
            match kind {
                EntryKind::Movie => kinds.movies = true,
                EntryKind::Series => kinds.series = true,
            }
        }
        kinds
    }
}

/// Marker passed to the catalog when an entry is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChangeKind {
    /// Identifier or other metadata fields were edited.
    MetadataEdit,
    /// The entry joined a collection container.
    MembershipUpdate,
}

/// A media item stored in the local catalog.
///
/// Entries are created and destroyed by the catalog store. Reconciliation only
/// mutates `identifiers` and `collections` and hands the entry back for
/// persistence.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CatalogEntry {
    pub handle: EntryHandle,
    pub name: String,
    pub library_id: LibraryId,
    pub kind: EntryKind,
    #[cfg_attr(feature = "serde", serde(default))]
    pub identifiers: IdentifierSet,
    #[cfg_attr(feature = "serde", serde(default))]
    pub collections: Vec<ContainerHandle>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub path: Option<PathBuf>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub is_virtual: bool,
    pub updated_at: DateTime<Utc>,
}

impl CatalogEntry {
    pub fn new(
        name: impl Into<String>,
        library_id: LibraryId,
        kind: EntryKind,
    ) -> Self {
        Self {
            handle: EntryHandle::new(),
            name: name.into(),
            library_id,
            kind,
            identifiers: IdentifierSet::new(),
            collections: Vec::new(),
            path: None,
            is_virtual: false,
            updated_at: Utc::now(),
        }
    }

    pub fn with_identifier(
        mut self,
        namespace: IdentifierNamespace,
        value: impl AsRef<str>,
    ) -> Self {
        self.identifiers = self.identifiers.with(namespace, value);
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn identifier(&self, namespace: IdentifierNamespace) -> Option<&str> {
        self.identifiers.get(namespace)
    }

    pub fn set_identifier(&mut self, key: IdentifierKey) -> Option<String> {
        self.identifiers.insert(key)
    }

    /// Entries with a filesystem path that are not virtual placeholders.
    pub fn is_materialized(&self) -> bool {
        self.path.is_some() && !self.is_virtual
    }

    pub fn is_member_of(&self, container: ContainerHandle) -> bool {
        self.collections.contains(&container)
    }

    /// Records membership locally. Returns `false` if already a member.
    pub fn add_collection(&mut self, container: ContainerHandle) -> bool {
        if self.is_member_of(container) {
            return false;
        }
        self.collections.push(container);
        true
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
