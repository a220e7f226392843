use std::fmt;

use crate::identifiers::{IdentifierNamespace, IdentifierSet};

/// Opaque id of a group published by the remote source ("top250-movies",
/// "sequels:672", a curated list slug, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ExternalGroupId(pub String);

impl ExternalGroupId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExternalGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ExternalGroupId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Snapshot of a remote record, fetched per run and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExternalItem {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub identifiers: IdentifierSet,
}

impl ExternalItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identifiers: IdentifierSet::new(),
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
}
