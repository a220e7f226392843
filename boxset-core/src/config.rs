use std::collections::HashSet;

use boxset_model::EntryKinds;
use serde::{Deserialize, Serialize};

use crate::collections::{CollectionPlan, Materialization, ScopeFilter};
use crate::error::SyncError;
use crate::guard::TaskKind;
use crate::matching::MAX_BATCH_SIZE;
use crate::task::fill::FILL_PRIMARY_IDS_KIND;

/// Top-level reconciler settings.
///
/// All fields carry defaults so a config file only needs the sections it
/// wants to change.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Remote metadata source connection.
    pub lookup: LookupConfig,
    /// Identifiers sent per remote or catalog call. Capped at 100.
    pub batch_size: usize,
    /// Primary id backfill task.
    pub fill_primary_ids: FillPrimaryIdsConfig,
    /// Collection sync tasks, one per entry.
    pub collections: Vec<CollectionDefinition>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            lookup: LookupConfig::default(),
            batch_size: MAX_BATCH_SIZE,
            fill_primary_ids: FillPrimaryIdsConfig::default(),
            collections: Vec::new(),
        }
    }
}

impl SyncConfig {
    /// Every task kind this configuration enables, in build order.
    pub fn task_kinds(&self) -> Vec<TaskKind> {
        let mut kinds = Vec::new();
        if self.fill_primary_ids.enabled {
            kinds.push(TaskKind::new(FILL_PRIMARY_IDS_KIND));
        }
        kinds.extend(
            self.collections.iter().map(CollectionDefinition::task_kind),
        );
        kinds
    }

    pub fn validate(&self) -> Result<(), SyncError> {
        if self.batch_size == 0 {
            return Err(SyncError::Config(
                "batch_size must be at least 1".into(),
            ));
        }
        if self.lookup.base_url.trim().is_empty() {
            return Err(SyncError::Config("lookup.base_url is empty".into()));
        }

        let mut seen = HashSet::new();
        for definition in &self.collections {
            if definition.id.trim().is_empty() {
                return Err(SyncError::Config("collection id is empty".into()));
            }
            if definition.name.trim().is_empty() {
                return Err(SyncError::Config(format!(
                    "collection '{}' has an empty name",
                    definition.id
                )));
            }
            if definition.group.trim().is_empty() {
                return Err(SyncError::Config(format!(
                    "collection '{}' has no group",
                    definition.id
                )));
            }
            if definition.kinds.is_empty() {
                return Err(SyncError::Config(format!(
                    "collection '{}' selects no entry kinds",
                    definition.id
                )));
            }
            if !seen.insert(definition.task_kind()) {
                return Err(SyncError::Config(format!(
                    "collection id '{}' is defined twice",
                    definition.id
                )));
            }
        }
        Ok(())
    }
}

/// Connection settings for the remote metadata source.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Base URL of the lookup API, e.g. `https://meta.example.org/`.
    pub base_url: String,
    /// Sent as `X-Api-Key` when set.
    pub api_key: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8787/".to_string(),
            api_key: None,
            timeout_secs: 30,
            user_agent: concat!("boxset/", env!("CARGO_PKG_VERSION"))
                .to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FillPrimaryIdsConfig {
    pub enabled: bool,
    pub kinds: EntryKinds,
    /// Library names to restrict the backfill to; empty means all.
    pub libraries: Vec<String>,
}

impl Default for FillPrimaryIdsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            kinds: EntryKinds::ALL,
            libraries: Vec::new(),
        }
    }
}

/// One collection to keep in sync with a remote group.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CollectionDefinition {
    /// Stable id; the task kind is `collection:{id}`.
    pub id: String,
    /// Remote group id.
    pub group: String,
    /// Container display name.
    pub name: String,
    #[serde(default)]
    pub kinds: EntryKinds,
    /// Library names to draw from; empty means all compatible libraries.
    #[serde(default)]
    pub libraries: Vec<String>,
    /// Create one container per library instead of one merged container.
    #[serde(default)]
    pub per_library: bool,
}

impl CollectionDefinition {
    pub fn task_kind(&self) -> TaskKind {
        TaskKind::new(format!("collection:{}", self.id.trim()))
    }

    pub fn to_plan(&self) -> CollectionPlan {
        CollectionPlan {
            kind: self.task_kind(),
            group: self.group.trim().into(),
            name: self.name.trim().to_string(),
            kinds: self.kinds,
            scope_filter: ScopeFilter::named(self.libraries.iter().cloned()),
            materialization: if self.per_library {
                Materialization::PerLibrary
            } else {
                Materialization::Merged
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(id: &str) -> CollectionDefinition {
        CollectionDefinition {
            id: id.to_string(),
            group: "top250-movies".to_string(),
            name: "Top 250".to_string(),
            kinds: EntryKinds::MOVIES,
            libraries: Vec::new(),
            per_library: false,
        }
    }

    #[test]
    fn defaults_validate() {
        let config = SyncConfig::default();
        config.validate().expect("defaults are valid");
        assert_eq!(
            config.task_kinds(),
            vec![TaskKind::new("fill-primary-ids")]
        );
    }

    #[test]
    fn duplicate_collection_ids_are_rejected() {
        let config = SyncConfig {
            collections: vec![definition("top"), definition(" top ")],
            ..SyncConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("defined twice"), "{err}");
    }

    #[test]
    fn definition_maps_to_plan() {
        let mut def = definition("top");
        def.per_library = true;
        def.libraries = vec!["Movies".into()];
        let plan = def.to_plan();

        assert_eq!(plan.kind, TaskKind::new("collection:top"));
        assert_eq!(plan.group.as_str(), "top250-movies");
        assert_eq!(plan.materialization, Materialization::PerLibrary);
        assert_eq!(plan.scope_filter, ScopeFilter::named(["Movies"]));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let raw = r#"{
            "batch_size": 50,
            "collections": [
                {
                    "id": "top",
                    "group": "top250",
                    "name": "Top 250",
                    "kinds": ["movie"]
                }
            ]
        }"#;
        let config: SyncConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.batch_size, 50);
        assert!(config.fill_primary_ids.enabled);
        assert_eq!(config.collections[0].kinds, EntryKinds::MOVIES);
        assert!(!config.collections[0].per_library);
    }
}
