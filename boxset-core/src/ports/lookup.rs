use std::collections::HashMap;

use async_trait::async_trait;
use boxset_model::{ExternalGroupId, ExternalItem, IdentifierNamespace};

use crate::error::LookupError;

/// Port for the remote metadata source.
#[async_trait]
pub trait ExternalLookupClient: Send + Sync {
    /// Translate secondary identifiers of `namespace` into primary ids.
    ///
    /// The returned map is keyed by the submitted value. Values the source
    /// does not know are simply absent. Callers own batching; a client may
    /// reject batches it cannot serve with [`LookupError::BatchTooLarge`].
    async fn resolve_primary_ids(
        &self,
        namespace: IdentifierNamespace,
        values: &[String],
    ) -> Result<HashMap<String, String>, LookupError>;

    /// Ordered members of a named group. Unknown groups yield an empty list.
    async fn fetch_named_group(
        &self,
        group: &ExternalGroupId,
    ) -> Result<Vec<ExternalItem>, LookupError>;
}
