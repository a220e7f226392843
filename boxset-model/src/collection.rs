use crate::ids::{ContainerHandle, EntryHandle};

/// Display name of the root folder that parents every collection container.
pub const ROOT_COLLECTIONS_NAME: &str = "Collections";

/// A persisted, named grouping of catalog entries (a box set).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CollectionContainer {
    pub handle: ContainerHandle,
    pub name: String,
    /// `None` only for the root collections folder itself.
    #[cfg_attr(feature = "serde", serde(default))]
    pub parent: Option<ContainerHandle>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub members: Vec<EntryHandle>,
}

impl CollectionContainer {
    pub fn new(
        name: impl Into<String>,
        parent: Option<ContainerHandle>,
        members: Vec<EntryHandle>,
    ) -> Self {
        Self {
            handle: ContainerHandle::new(),
            name: name.into(),
            parent,
            members,
        }
    }

    pub fn contains(&self, entry: EntryHandle) -> bool {
        self.members.contains(&entry)
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}
