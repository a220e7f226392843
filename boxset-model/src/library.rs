use std::fmt;

use crate::entry::EntryKind;
use crate::ids::LibraryId;

/// The type of content a library contains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "PascalCase"))]
pub enum LibraryKind {
    Movies,
    Series,
    Mixed,
}

impl LibraryKind {
    pub fn admits(&self, kind: EntryKind) -> bool {
        match self {
            LibraryKind::Movies => kind == EntryKind::Movie,
            LibraryKind::Series => kind == EntryKind::Series,
            LibraryKind::Mixed => true,
        }
    }
}

impl fmt::Display for LibraryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryKind::Movies => write!(f, "Movies"),
            LibraryKind::Series => write!(f, "TV Shows"),
            LibraryKind::Mixed => write!(f, "Mixed"),
        }
    }
}

/// A library: the scope boundary for catalog queries.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Library {
    pub id: LibraryId,
    pub name: String,
    pub kind: LibraryKind,
}

impl Library {
    pub fn new(name: impl Into<String>, kind: LibraryKind) -> Self {
        Self {
            id: LibraryId::new(),
            name: name.into(),
            kind,
        }
    }
}
