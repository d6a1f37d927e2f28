use std::sync::Arc;

use restock_catalog::{
    InMemoryCatalog, InMemoryTaskScheduler, InMemoryTransientStore, ItemQuery, MetadataStore,
    TaskScheduler, TaxonomyStore, TransientStore,
};
use restock_core::Clock;

/// Platform services the classifier consumes.
#[derive(Clone)]
pub struct Collaborators {
    pub metadata: Arc<dyn MetadataStore>,
    pub taxonomy: Arc<dyn TaxonomyStore>,
    pub items: Arc<dyn ItemQuery>,
    pub transients: Arc<dyn TransientStore>,
    pub scheduler: Arc<dyn TaskScheduler>,
    pub clock: Arc<dyn Clock>,
}

impl Collaborators {
    /// Wire the in-memory implementations (tests/dev).
    pub fn in_memory(
        catalog: Arc<InMemoryCatalog>,
        transients: Arc<InMemoryTransientStore>,
        scheduler: Arc<InMemoryTaskScheduler>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            metadata: catalog.clone(),
            taxonomy: catalog.clone(),
            items: catalog,
            transients,
            scheduler,
            clock,
        }
    }
}

impl core::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Collaborators")
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}
