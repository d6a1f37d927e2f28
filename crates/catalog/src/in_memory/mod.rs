//! In-memory collaborators for tests/dev.

mod catalog;
mod scheduler;
mod transient;

pub use catalog::{InMemoryCatalog, ItemRecord};
pub use scheduler::{InMemoryTaskScheduler, ScheduledTask};
pub use transient::InMemoryTransientStore;
