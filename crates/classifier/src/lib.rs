//! The "new-and-restocked" classification rule.
//!
//! Newly published products, and products whose stock goes from zero to
//! positive, are tagged with a fixed classification term. The tag is retracted
//! by a daily sweep once it is older than the dwell period, or immediately
//! when stock runs out.
//!
//! - [`RestockClassifier`] holds the handlers (publish, stock change, sweep)
//! - [`LeaseGuard`] keeps overlapping sweeps apart
//! - [`Installation`] ties handler subscriptions to a dispatcher

pub mod classifier;
pub mod collaborators;
pub mod error;
pub mod lease;
pub mod lifecycle;
pub mod policy;
pub mod resolver;
pub mod sweep;

#[cfg(test)]
pub(crate) mod testing;

pub use classifier::{PublishOutcome, RestockClassifier, StockAction, StockOutcome};
pub use collaborators::Collaborators;
pub use error::ClassifierError;
pub use lease::{Acquire, Lease, LeaseGuard};
pub use lifecycle::Installation;
pub use policy::{PublishTrigger, RestockPolicy, ScheduleOn};
pub use resolver::TermResolver;
pub use sweep::{SweepOutcome, SweepReport};
