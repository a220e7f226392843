use boxset_model::{ExternalGroupId, IdentifierNamespace, ModelError};
use thiserror::Error;

/// Failures reported by an
/// [`ExternalLookupClient`](crate::ports::ExternalLookupClient).
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Batch of {size} {namespace} ids exceeds the limit of {max}")]
    BatchTooLarge {
        namespace: IdentifierNamespace,
        size: usize,
        max: usize,
    },
}

/// Failures reported by a [`CatalogGateway`](crate::ports::CatalogGateway).
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Everything that can end or shorten a synchronization run.
///
/// `GuardBusy`, `EmptyExternalGroup` and `Cancelled` are expected outcomes and
/// surface as [`SkipReason`] or a cancelled failure rather than as logged
/// errors.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("a run of task '{kind}' is already in progress")]
    GuardBusy { kind: String },

    #[error("external group '{group}' has no items")]
    EmptyExternalGroup { group: ExternalGroupId },

    #[error("{count} collections are named '{name}'")]
    AmbiguousCollectionName { name: String, count: usize },

    #[error("remote lookup failed: {0}")]
    RemoteLookup(#[from] LookupError),

    #[error("catalog gateway failed: {0}")]
    Gateway(#[from] CatalogError),

    #[error("run cancelled")]
    Cancelled,

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl SyncError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SyncError::Cancelled)
    }

    /// The skip this error stands for, when it is an expected early exit.
    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            SyncError::GuardBusy { .. } => Some(SkipReason::AlreadyRunning),
            SyncError::EmptyExternalGroup { group } => {
                Some(SkipReason::EmptyExternalGroup(group.clone()))
            }
            _ => None,
        }
    }
}

/// Why a run ended without doing any work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyRunning,
    EmptyExternalGroup(ExternalGroupId),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::AlreadyRunning => write!(f, "already running"),
            SkipReason::EmptyExternalGroup(group) => {
                write!(f, "external group '{group}' is empty")
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
