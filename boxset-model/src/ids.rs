use std::str::FromStr;

use uuid::Uuid;

use crate::error::ModelError;

/// Handle of a catalog entry. Assigned by the catalog store and stable for
/// the lifetime of the entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct EntryHandle(pub Uuid);

impl Default for EntryHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl EntryHandle {
    pub fn new() -> Self {
        EntryHandle(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    pub fn to_uuid(&self) -> Uuid {
        self.0
    }
}

impl AsRef<Uuid> for EntryHandle {
    fn as_ref(&self) -> &Uuid {
        &self.0
    }
}

impl FromStr for EntryHandle {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(EntryHandle)
            .map_err(|_| ModelError::InvalidHandle(s.to_string()))
    }
}

impl std::fmt::Display for EntryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle of a persisted grouping object: a collection container or the
/// root library folder that parents collections.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ContainerHandle(pub Uuid);

impl Default for ContainerHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerHandle {
    pub fn new() -> Self {
        ContainerHandle(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    pub fn to_uuid(&self) -> Uuid {
        self.0
    }
}

impl AsRef<Uuid> for ContainerHandle {
    fn as_ref(&self) -> &Uuid {
        &self.0
    }
}

impl FromStr for ContainerHandle {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(ContainerHandle)
            .map_err(|_| ModelError::InvalidHandle(s.to_string()))
    }
}

impl std::fmt::Display for ContainerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Strongly typed ID for libraries (the scopes catalog queries run against)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct LibraryId(pub Uuid);

impl Default for LibraryId {
    fn default() -> Self {
        Self::new()
    }
}

impl LibraryId {
    pub fn new() -> Self {
        LibraryId(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    pub fn to_uuid(&self) -> Uuid {
        self.0
    }
}

impl AsRef<Uuid> for LibraryId {
    fn as_ref(&self) -> &Uuid {
        &self.0
    }
}

impl FromStr for LibraryId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(LibraryId)
            .map_err(|_| ModelError::InvalidHandle(s.to_string()))
    }
}

impl std::fmt::Display for LibraryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
