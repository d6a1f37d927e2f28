//! Advisory, time-bounded lease over a transient key.
//!
//! The lease is cooperative: holders check before taking it, and the value
//! expires on its own if a holder dies without releasing. It does not protect
//! a holder that runs past its ttl.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use restock_catalog::TransientStore;
use restock_core::LeaseOwnerId;

use crate::error::ClassifierError;

/// Stored lease value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    pub owner: LeaseOwnerId,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Lease {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Result of an acquisition attempt.
#[derive(Debug)]
pub enum Acquire<'a> {
    Acquired(LeaseGuard<'a>),
    /// Someone else holds the key. `None` when the stored value is not a
    /// lease (e.g. a bare flag written by another tool); it is still honoured.
    Held(Option<Lease>),
}

/// Scoped lease ownership. Dropping the guard releases the lease.
pub struct LeaseGuard<'a> {
    store: &'a dyn TransientStore,
    key: String,
    lease: Lease,
    released: bool,
}

impl core::fmt::Debug for LeaseGuard<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LeaseGuard")
            .field("key", &self.key)
            .field("lease", &self.lease)
            .field("released", &self.released)
            .finish()
    }
}

impl<'a> LeaseGuard<'a> {
    pub fn acquire(
        store: &'a dyn TransientStore,
        key: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<Acquire<'a>, ClassifierError> {
        if let Some(raw) = store.get(key)? {
            match serde_json::from_str::<Lease>(&raw) {
                // Stores without native expiry can hand back a dead lease.
                Ok(existing) if !existing.is_live(now) => {
                    debug!(key, owner = %existing.owner, "taking over expired lease");
                }
                Ok(existing) => return Ok(Acquire::Held(Some(existing))),
                Err(_) => return Ok(Acquire::Held(None)),
            }
        }

        let span = chrono::Duration::from_std(ttl)
            .map_err(|e| ClassifierError::LeaseEncoding(format!("ttl out of range: {e}")))?;
        let lease = Lease {
            owner: LeaseOwnerId::new(),
            acquired_at: now,
            expires_at: now + span,
        };
        let encoded =
            serde_json::to_string(&lease).map_err(|e| ClassifierError::LeaseEncoding(e.to_string()))?;
        store.set(key, encoded, ttl)?;
        debug!(key, owner = %lease.owner, expires_at = %lease.expires_at, "lease acquired");

        Ok(Acquire::Acquired(LeaseGuard {
            store,
            key: key.to_string(),
            lease,
            released: false,
        }))
    }

    pub fn lease(&self) -> &Lease {
        &self.lease
    }

    /// Release now. Returns `false` if the key no longer held this lease
    /// (expired, or taken over by another holder).
    pub fn release(mut self) -> Result<bool, ClassifierError> {
        self.released = true;
        self.release_owned()
    }

    fn release_owned(&self) -> Result<bool, ClassifierError> {
        let Some(raw) = self.store.get(&self.key)? else {
            return Ok(false);
        };
        match serde_json::from_str::<Lease>(&raw) {
            Ok(current) if current.owner == self.lease.owner => {
                self.store.delete(&self.key)?;
                debug!(key = %self.key, owner = %self.lease.owner, "lease released");
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

impl Drop for LeaseGuard<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(err) = self.release_owned() {
            warn!(key = %self.key, error = %err, "failed to release lease; it will expire");
        }
    }
}
