//! Notification publishing/subscription abstraction (mechanics only).
//!
//! The bus decouples whoever observes platform lifecycle changes (a webhook
//! receiver, a database trigger poller, a test) from the classifier that
//! reacts to them.
//!
//! ## Delivery
//!
//! - **Broadcast**: each subscriber gets a copy of every published message
//! - **At-least-once**: messages may be delivered more than once
//! - **No persistence**: the bus is for distribution only
//!
//! Consumers must be idempotent. The classifier's handlers are: re-publishing
//! an item never re-stamps it, and replaying a stock level is a no-op once the
//! previous-quantity marker already holds it.

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

/// A subscription to a bus.
///
/// ```ignore
/// let subscription = bus.subscribe();
///
/// loop {
///     match subscription.recv_timeout(Duration::from_secs(1)) {
///         Ok(envelope) => dispatcher.dispatch(envelope.payload()),
///         Err(std::sync::mpsc::RecvTimeoutError::Timeout) => continue,  // Check for shutdown
///         Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,  // Bus closed
///     }
/// }
/// ```
///
/// Subscriptions are meant for a single consuming thread.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, std::sync::mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// Transport-agnostic pub/sub bus.
///
/// `publish()` can fail (e.g. internal lock poisoning, a remote broker being
/// unreachable); failures are surfaced to the publisher.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
