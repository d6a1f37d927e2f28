//! `restock-core`: shared building blocks for the restock classifier.
//!
//! This crate contains **pure** primitives (no IO, no storage): identifiers,
//! catalog item vocabulary, the clock abstraction and the domain error model.

pub mod clock;
pub mod error;
pub mod id;
pub mod item;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{DomainError, DomainResult};
pub use id::{ItemId, LeaseOwnerId, TermId};
pub use item::{ItemKind, ItemStatus};
