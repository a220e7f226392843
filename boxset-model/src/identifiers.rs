//! External identifier namespaces and the per-entry identifier set.
//!
//! Every catalog entry and every remote record carries at most one value per
//! [`IdentifierNamespace`]. Matching between the two sides is exact string
//! equality within a namespace; values are opaque and never normalised beyond
//! trimming surrounding whitespace.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;

/// Namespace an identifier value belongs to.
///
/// `Primary` is the remote source's own catalog id. The secondary namespaces
/// are cross-reference keys that can be translated into `Primary`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum IdentifierNamespace {
    Primary,
    Imdb,
    Tmdb,
}

impl IdentifierNamespace {
    /// Secondary namespaces in waterfall order: an entry is only ever looked
    /// up through the first namespace in this list that it carries.
    pub const SECONDARY_PRIORITY: [IdentifierNamespace; 2] =
        [IdentifierNamespace::Imdb, IdentifierNamespace::Tmdb];

    pub fn as_str(&self) -> &'static str {
        match self {
            IdentifierNamespace::Primary => "primary",
            IdentifierNamespace::Imdb => "imdb",
            IdentifierNamespace::Tmdb => "tmdb",
        }
    }

    pub fn is_secondary(&self) -> bool {
        !matches!(self, IdentifierNamespace::Primary)
    }
}

impl fmt::Display for IdentifierNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdentifierNamespace {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "primary" => Ok(IdentifierNamespace::Primary),
            "imdb" => Ok(IdentifierNamespace::Imdb),
            "tmdb" => Ok(IdentifierNamespace::Tmdb),
            _ => Err(ModelError::UnknownNamespace(s.to_string())),
        }
    }
}

/// A single `(namespace, value)` pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IdentifierKey {
    pub namespace: IdentifierNamespace,
    pub value: String,
}

impl IdentifierKey {
    pub fn new(
        namespace: IdentifierNamespace,
        value: impl AsRef<str>,
    ) -> Result<Self, ModelError> {
        let value = value.as_ref().trim();
        if value.is_empty() {
            return Err(ModelError::EmptyIdentifier(namespace));
        }
        Ok(Self {
            namespace,
            value: value.to_string(),
        })
    }

    pub fn primary(value: impl AsRef<str>) -> Result<Self, ModelError> {
        Self::new(IdentifierNamespace::Primary, value)
    }

    pub fn imdb(value: impl AsRef<str>) -> Result<Self, ModelError> {
        Self::new(IdentifierNamespace::Imdb, value)
    }

    pub fn tmdb(value: impl AsRef<str>) -> Result<Self, ModelError> {
        Self::new(IdentifierNamespace::Tmdb, value)
    }
}

impl fmt::Display for IdentifierKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.value)
    }
}

/// Identifiers attached to one entry, at most one value per namespace.
///
/// Inserting a namespace that is already present replaces the old value.
/// Deserialized maps go through the same trimming as [`IdentifierKey::new`]
/// and blank values are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(
        from = "BTreeMap<IdentifierNamespace, String>",
        into = "BTreeMap<IdentifierNamespace, String>"
    )
)]
pub struct IdentifierSet {
    values: BTreeMap<IdentifierNamespace, String>,
}

impl IdentifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the previous value for the namespace, if any.
    pub fn insert(&mut self, key: IdentifierKey) -> Option<String> {
        self.values.insert(key.namespace, key.value)
    }

    /// Builder-style insert; blank values are ignored.
    pub fn with(
        mut self,
        namespace: IdentifierNamespace,
        value: impl AsRef<str>,
    ) -> Self {
        if let Ok(key) = IdentifierKey::new(namespace, value) {
            self.insert(key);
        }
        self
    }

    pub fn get(&self, namespace: IdentifierNamespace) -> Option<&str> {
        self.values.get(&namespace).map(String::as_str)
    }

    pub fn contains(&self, namespace: IdentifierNamespace) -> bool {
        self.values.contains_key(&namespace)
    }

    pub fn key(&self, namespace: IdentifierNamespace) -> Option<IdentifierKey> {
        self.values.get(&namespace).map(|value| IdentifierKey {
            namespace,
            value: value.clone(),
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = IdentifierKey> + '_ {
        self.values.iter().map(|(namespace, value)| IdentifierKey {
            namespace: *namespace,
            value: value.clone(),
        })
    }

    pub fn has_primary(&self) -> bool {
        self.contains(IdentifierNamespace::Primary)
    }

    pub fn has_any_secondary(&self) -> bool {
        self.values.keys().any(IdentifierNamespace::is_secondary)
    }

    /// True when any `(namespace, value)` pair of this set is in `keys`.
    pub fn intersects(&self, keys: &HashSet<IdentifierKey>) -> bool {
        self.keys().any(|key| keys.contains(&key))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<BTreeMap<IdentifierNamespace, String>> for IdentifierSet {
    fn from(values: BTreeMap<IdentifierNamespace, String>) -> Self {
        values
            .into_iter()
            .filter_map(|(namespace, value)| {
                IdentifierKey::new(namespace, value).ok()
            })
            .collect()
    }
}

impl From<IdentifierSet> for BTreeMap<IdentifierNamespace, String> {
    fn from(set: IdentifierSet) -> Self {
        set.values
    }
}

impl FromIterator<IdentifierKey> for IdentifierSet {
    fn from_iter<I: IntoIterator<Item = IdentifierKey>>(iter: I) -> Self {
        let mut set = IdentifierSet::new();
        for key in iter {
            set.insert(key);
        }
        set
    }
}
