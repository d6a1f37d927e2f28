//! Typed notification dispatch.
//!
//! Components register one handler per [`EventKind`] they care about and keep
//! the returned [`SubscriptionId`] so they can unregister deterministically at
//! teardown. Dispatch is synchronous: handlers run inline on the caller's
//! thread, in registration order.
//!
//! Handler failures never reach the event source. They are logged and the
//! remaining handlers still run.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use crate::{CatalogEvent, Event, EventKind};

/// Handler function type.
pub type NotificationHandler = Arc<dyn Fn(&CatalogEvent) -> anyhow::Result<()> + Send + Sync>;

/// Identifies one registration. Ordered by registration time.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl core::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

struct Registration {
    kind: EventKind,
    name: String,
    handler: NotificationHandler,
}

/// Routes catalog notifications to registered handlers.
pub struct NotificationDispatcher {
    next_id: AtomicU64,
    registrations: RwLock<BTreeMap<SubscriptionId, Registration>>,
}

impl core::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("subscriptions", &self.subscriptions())
            .finish()
    }
}

impl Default for NotificationDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationDispatcher {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            registrations: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register `handler` for every notification of `kind`.
    pub fn subscribe<F>(&self, kind: EventKind, name: impl Into<String>, handler: F) -> SubscriptionId
    where
        F: Fn(&CatalogEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let name = name.into();
        debug!(subscription = %id, kind = ?kind, handler = %name, "handler subscribed");

        let registration = Registration {
            kind,
            name,
            handler: Arc::new(handler),
        };
        match self.registrations.write() {
            Ok(mut regs) => {
                regs.insert(id, registration);
            }
            Err(poisoned) => {
                poisoned.into_inner().insert(id, registration);
            }
        }
        id
    }

    /// Remove a registration. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = match self.registrations.write() {
            Ok(mut regs) => regs.remove(&id),
            Err(poisoned) => poisoned.into_inner().remove(&id),
        };
        if let Some(reg) = &removed {
            debug!(subscription = %id, handler = %reg.name, "handler unsubscribed");
        }
        removed.is_some()
    }

    /// Deliver `event` to every handler registered for its kind.
    ///
    /// Returns the number of handlers invoked. The registry lock is not held
    /// while handlers run, so a handler may (un)subscribe.
    pub fn dispatch(&self, event: &CatalogEvent) -> usize {
        let kind = event.kind();
        let targets: Vec<(SubscriptionId, String, NotificationHandler)> = {
            let regs = match self.registrations.read() {
                Ok(regs) => regs,
                Err(poisoned) => poisoned.into_inner(),
            };
            regs.iter()
                .filter(|(_, r)| r.kind == kind)
                .map(|(id, r)| (*id, r.name.clone(), r.handler.clone()))
                .collect()
        };

        for (id, name, handler) in &targets {
            if let Err(err) = handler(event) {
                warn!(
                    subscription = %id,
                    handler = %name,
                    event_type = event.event_type(),
                    error = %err,
                    "notification handler failed"
                );
            }
        }

        targets.len()
    }

    /// Snapshot of current registrations, in registration order.
    pub fn subscriptions(&self) -> Vec<(SubscriptionId, EventKind, String)> {
        let regs = match self.registrations.read() {
            Ok(regs) => regs,
            Err(poisoned) => poisoned.into_inner(),
        };
        regs.iter()
            .map(|(id, r)| (*id, r.kind, r.name.clone()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions().is_empty()
    }
}
