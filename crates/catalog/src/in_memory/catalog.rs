use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};

use restock_core::{ItemId, ItemKind, ItemStatus, TermId};

use crate::error::{CatalogError, CatalogResult};
use crate::ports::{ItemFilter, ItemQuery, MetadataStore, TaxonomyStore};

/// Snapshot of one stored item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRecord {
    pub id: ItemId,
    pub kind: ItemKind,
    pub status: ItemStatus,
    pub terms: BTreeSet<TermId>,
    pub meta: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
struct TermRecord {
    id: TermId,
    label: String,
    taxonomy: String,
}

#[derive(Debug, Default)]
struct State {
    items: BTreeMap<ItemId, ItemRecord>,
    terms: Vec<TermRecord>,
    next_term: u64,
}

/// In-memory catalog: items, their metadata and term associations.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    state: RwLock<State>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Insert (or replace) an item with no terms and no metadata.
    pub fn insert_item(&self, id: ItemId, kind: ItemKind, status: ItemStatus) {
        if let Ok(mut state) = self.state.write() {
            state.items.insert(
                id,
                ItemRecord {
                    id,
                    kind,
                    status,
                    terms: BTreeSet::new(),
                    meta: BTreeMap::new(),
                },
            );
        }
    }

    pub fn set_status(&self, id: ItemId, status: ItemStatus) -> CatalogResult<ItemStatus> {
        let mut state = self.state.write().map_err(|_| CatalogError::Poisoned)?;
        let record = state.items.get_mut(&id).ok_or(CatalogError::ItemNotFound(id))?;
        Ok(std::mem::replace(&mut record.status, status))
    }

    /// Register a term and return its id. Returns the existing id when the
    /// `(label, taxonomy)` pair is already defined.
    pub fn define_term(&self, label: &str, taxonomy: &str) -> CatalogResult<TermId> {
        let mut state = self.state.write().map_err(|_| CatalogError::Poisoned)?;
        if let Some(existing) = state
            .terms
            .iter()
            .find(|t| t.label == label && t.taxonomy == taxonomy)
        {
            return Ok(existing.id);
        }
        state.next_term += 1;
        let id = TermId::new(state.next_term)
            .ok_or_else(|| CatalogError::storage("term id space exhausted"))?;
        state.terms.push(TermRecord {
            id,
            label: label.to_string(),
            taxonomy: taxonomy.to_string(),
        });
        Ok(id)
    }

    /// Remove a term definition and every association with it.
    pub fn delete_term(&self, term: TermId) -> CatalogResult<()> {
        let mut state = self.state.write().map_err(|_| CatalogError::Poisoned)?;
        let before = state.terms.len();
        state.terms.retain(|t| t.id != term);
        if state.terms.len() == before {
            return Err(CatalogError::TermNotFound(term));
        }
        for item in state.items.values_mut() {
            item.terms.remove(&term);
        }
        Ok(())
    }

    pub fn item(&self, id: ItemId) -> Option<ItemRecord> {
        self.state.read().ok()?.items.get(&id).cloned()
    }

    fn known_term(state: &State, term: TermId) -> CatalogResult<()> {
        if state.terms.iter().any(|t| t.id == term) {
            Ok(())
        } else {
            Err(CatalogError::TermNotFound(term))
        }
    }
}

impl MetadataStore for InMemoryCatalog {
    fn get(&self, item: ItemId, key: &str) -> CatalogResult<Option<String>> {
        let state = self.state.read().map_err(|_| CatalogError::Poisoned)?;
        Ok(state
            .items
            .get(&item)
            .and_then(|record| record.meta.get(key).cloned()))
    }

    fn set(&self, item: ItemId, key: &str, value: String) -> CatalogResult<()> {
        let mut state = self.state.write().map_err(|_| CatalogError::Poisoned)?;
        let record = state
            .items
            .get_mut(&item)
            .ok_or(CatalogError::ItemNotFound(item))?;
        record.meta.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, item: ItemId, key: &str) -> CatalogResult<()> {
        let mut state = self.state.write().map_err(|_| CatalogError::Poisoned)?;
        if let Some(record) = state.items.get_mut(&item) {
            record.meta.remove(key);
        }
        Ok(())
    }
}

impl TaxonomyStore for InMemoryCatalog {
    fn term_by_label(&self, label: &str, taxonomy: &str) -> CatalogResult<Option<TermId>> {
        let state = self.state.read().map_err(|_| CatalogError::Poisoned)?;
        Ok(state
            .terms
            .iter()
            .find(|t| t.label == label && t.taxonomy == taxonomy)
            .map(|t| t.id))
    }

    fn attach(&self, item: ItemId, term: TermId) -> CatalogResult<()> {
        let mut state = self.state.write().map_err(|_| CatalogError::Poisoned)?;
        Self::known_term(&state, term)?;
        let record = state
            .items
            .get_mut(&item)
            .ok_or(CatalogError::ItemNotFound(item))?;
        record.terms.insert(term);
        Ok(())
    }

    fn detach(&self, item: ItemId, term: TermId) -> CatalogResult<()> {
        let mut state = self.state.write().map_err(|_| CatalogError::Poisoned)?;
        let record = state
            .items
            .get_mut(&item)
            .ok_or(CatalogError::ItemNotFound(item))?;
        record.terms.remove(&term);
        Ok(())
    }

    fn has_term(&self, item: ItemId, term: TermId) -> CatalogResult<bool> {
        let state = self.state.read().map_err(|_| CatalogError::Poisoned)?;
        Ok(state
            .items
            .get(&item)
            .is_some_and(|record| record.terms.contains(&term)))
    }
}

impl ItemQuery for InMemoryCatalog {
    fn find(&self, filter: &ItemFilter) -> CatalogResult<Vec<ItemId>> {
        let state = self.state.read().map_err(|_| CatalogError::Poisoned)?;
        Ok(state
            .items
            .values()
            .filter(|r| {
                r.kind == filter.kind && r.status == filter.status && r.terms.contains(&filter.term)
            })
            .map(|r| r.id)
            .collect())
    }
}
