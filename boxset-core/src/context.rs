use std::any::type_name_of_val;
use std::fmt;
use std::sync::Arc;

use crate::matching::{MAX_BATCH_SIZE, effective_batch_size};
use crate::ports::{CatalogGateway, ExternalLookupClient};

/// Collaborators shared by every task body.
///
/// Composition-based façade so bodies can be constructed and tested against
/// fakes without knowing the concrete adapters.
#[derive(Clone)]
pub struct SyncContext {
    pub lookup: Arc<dyn ExternalLookupClient>,
    pub catalog: Arc<dyn CatalogGateway>,
    batch_size: usize,
}

impl SyncContext {
    pub fn new(
        lookup: Arc<dyn ExternalLookupClient>,
        catalog: Arc<dyn CatalogGateway>,
    ) -> Self {
        Self {
            lookup,
            catalog,
            batch_size: MAX_BATCH_SIZE,
        }
    }

    /// Lower the per-call batch size. Values above the hard limit are clamped.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = effective_batch_size(batch_size);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}

impl fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncContext")
            .field("lookup", &type_name_of_val(self.lookup.as_ref()))
            .field("catalog", &type_name_of_val(self.catalog.as_ref()))
            .field("batch_size", &self.batch_size)
            .finish()
    }
}
