//! Catalog notifications and their delivery mechanics.
//!
//! - `catalog`: the notifications the host platform emits (status transitions,
//!   publications, stock changes, due scheduled tasks)
//! - `bus`: broadcast pub/sub transport for envelopes
//! - `dispatcher`: typed handler registration with deterministic unregistration

pub mod bus;
pub mod catalog;
pub mod dispatcher;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use catalog::{
    CatalogEvent, EventKind, ItemPublished, StatusTransitioned, StockChanged, TaskDue,
};
pub use dispatcher::{NotificationDispatcher, NotificationHandler, SubscriptionId};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
