use boxset_model::{EntryKinds, ExternalGroupId, Library};

use crate::guard::TaskKind;
use crate::matching::collection_name;

/// Where a collection's members are gathered and stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Materialization {
    /// One container per library, named `"{name} ({library})"`.
    PerLibrary,
    /// One container named `"{name}"` holding matches from every library.
    #[default]
    Merged,
}

/// Which libraries a collection is allowed to draw from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeFilter {
    /// Library names to include; empty admits every library.
    pub libraries: Vec<String>,
}

impl ScopeFilter {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn named<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            libraries: names.into_iter().map(Into::into).collect(),
        }
    }

    /// A library qualifies when it is allow-listed (or no list is set) and
    /// can hold at least one of `kinds`.
    pub fn admits(&self, library: &Library, kinds: EntryKinds) -> bool {
        let listed = self.libraries.is_empty()
            || self
                .libraries
                .iter()
                .any(|name| name.eq_ignore_ascii_case(&library.name));
        listed && kinds.iter().any(|kind| library.kind.admits(kind))
    }
}

/// Everything that distinguishes one collection task from another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionPlan {
    pub kind: TaskKind,
    /// Remote group whose members make up the collection.
    pub group: ExternalGroupId,
    /// Base display name of the container.
    pub name: String,
    pub kinds: EntryKinds,
    pub scope_filter: ScopeFilter,
    pub materialization: Materialization,
}

impl CollectionPlan {
    pub fn new(
        kind: impl Into<TaskKind>,
        group: impl Into<ExternalGroupId>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            group: group.into(),
            name: name.into(),
            kinds: EntryKinds::ALL,
            scope_filter: ScopeFilter::any(),
            materialization: Materialization::default(),
        }
    }

    pub fn with_kinds(mut self, kinds: EntryKinds) -> Self {
        self.kinds = kinds;
        self
    }

    pub fn with_scope_filter(mut self, filter: ScopeFilter) -> Self {
        self.scope_filter = filter;
        self
    }

    pub fn per_library(mut self) -> Self {
        self.materialization = Materialization::PerLibrary;
        self
    }

    /// Container name for `library` under this plan's materialization.
    pub fn container_name(&self, library: Option<&Library>) -> String {
        match (self.materialization, library) {
            (Materialization::PerLibrary, Some(library)) => {
                collection_name(&self.name, Some(&library.name))
            }
            _ => collection_name(&self.name, None),
        }
    }
}
