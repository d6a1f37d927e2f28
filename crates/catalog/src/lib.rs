//! Catalog platform collaborators.
//!
//! The classifier never owns catalog data. Everything it reads or mutates goes
//! through the traits in [`ports`]; the host platform provides the real
//! implementations. [`in_memory`] contains implementations for tests/dev.

pub mod error;
pub mod in_memory;
pub mod meta;
pub mod ports;

pub use error::{CatalogError, CatalogResult};
pub use in_memory::{
    InMemoryCatalog, InMemoryTaskScheduler, InMemoryTransientStore, ItemRecord, ScheduledTask,
};
pub use meta::{ItemMeta, PREVIOUS_QUANTITY_KEY, TAGGED_AT_KEY};
pub use ports::{
    ItemFilter, ItemQuery, MetadataStore, Recurrence, TaskScheduler, TaxonomyStore, TransientStore,
};
