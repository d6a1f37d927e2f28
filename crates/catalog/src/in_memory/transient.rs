use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};

use restock_core::Clock;

use crate::error::{CatalogError, CatalogResult};
use crate::ports::TransientStore;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: DateTime<Utc>,
}

/// In-memory transient store. Expiry is evaluated lazily against `clock`.
#[derive(Debug)]
pub struct InMemoryTransientStore {
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemoryTransientStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.entries
            .read()
            .map(|e| e.values().filter(|entry| entry.expires_at > now).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TransientStore for InMemoryTransientStore {
    fn get(&self, key: &str) -> CatalogResult<Option<String>> {
        let now = self.clock.now();
        let mut entries = self.entries.write().map_err(|_| CatalogError::Poisoned)?;
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: String, ttl: Duration) -> CatalogResult<()> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| CatalogError::storage(format!("transient ttl out of range: {e}")))?;
        let expires_at = self.clock.now() + ttl;
        let mut entries = self.entries.write().map_err(|_| CatalogError::Poisoned)?;
        entries.insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    fn delete(&self, key: &str) -> CatalogResult<()> {
        let mut entries = self.entries.write().map_err(|_| CatalogError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use restock_core::ManualClock;

    #[test]
    fn values_expire_after_ttl() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = InMemoryTransientStore::new(clock.clone());

        store.set("lock", "1".to_string(), Duration::from_secs(600)).unwrap();
        clock.advance(chrono::Duration::seconds(599));
        assert_eq!(store.get("lock").unwrap().as_deref(), Some("1"));

        clock.advance(chrono::Duration::seconds(1));
        assert_eq!(store.get("lock").unwrap(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn delete_removes_immediately() {
        let store = InMemoryTransientStore::new(Arc::new(ManualClock::new(Utc::now())));
        store.set("k", "v".to_string(), Duration::from_secs(60)).unwrap();
        store.delete("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }
}
