//! Collaborator contracts consumed by the classifier.
//!
//! All methods are synchronous and fallible. Implementations must be safe to
//! share across threads: the in-process runtime calls them from both the
//! dispatch worker and the task runner.

use std::time::Duration;

use chrono::{DateTime, Utc};

use restock_core::{ItemId, ItemKind, ItemStatus, TermId};

use crate::error::CatalogResult;

/// Per-item open-ended string metadata.
pub trait MetadataStore: Send + Sync {
    /// `None` when the key is missing. An empty string is returned as stored.
    fn get(&self, item: ItemId, key: &str) -> CatalogResult<Option<String>>;
    fn set(&self, item: ItemId, key: &str, value: String) -> CatalogResult<()>;
    fn delete(&self, item: ItemId, key: &str) -> CatalogResult<()>;
}

/// Term lookup and item/term associations.
pub trait TaxonomyStore: Send + Sync {
    fn term_by_label(&self, label: &str, taxonomy: &str) -> CatalogResult<Option<TermId>>;

    /// Add `term` to the item's associations, keeping the existing ones.
    fn attach(&self, item: ItemId, term: TermId) -> CatalogResult<()>;

    fn detach(&self, item: ItemId, term: TermId) -> CatalogResult<()>;

    fn has_term(&self, item: ItemId, term: TermId) -> CatalogResult<bool>;
}

/// Batch item lookup.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ItemFilter {
    pub kind: ItemKind,
    pub status: ItemStatus,
    pub term: TermId,
}

impl ItemFilter {
    /// Published products carrying `term`.
    pub fn published_products_with(term: TermId) -> Self {
        Self {
            kind: ItemKind::Product,
            status: ItemStatus::Published,
            term,
        }
    }
}

pub trait ItemQuery: Send + Sync {
    /// Every matching item (unpaginated), ordered by id.
    fn find(&self, filter: &ItemFilter) -> CatalogResult<Vec<ItemId>>;
}

/// Short-lived keyed values that expire on their own.
pub trait TransientStore: Send + Sync {
    /// `None` when missing or expired.
    fn get(&self, key: &str) -> CatalogResult<Option<String>>;
    fn set(&self, key: &str, value: String, ttl: Duration) -> CatalogResult<()>;
    fn delete(&self, key: &str) -> CatalogResult<()>;
}

/// How often a registered task recurs.
#[derive(Debug, Copy, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recurrence {
    Hourly,
    Daily,
}

impl Recurrence {
    pub fn interval(self) -> chrono::Duration {
        match self {
            Recurrence::Hourly => chrono::Duration::hours(1),
            Recurrence::Daily => chrono::Duration::days(1),
        }
    }
}

/// Named recurring task registration.
pub trait TaskScheduler: Send + Sync {
    fn next_scheduled(&self, name: &str) -> CatalogResult<Option<DateTime<Utc>>>;
    fn schedule(&self, name: &str, first_run: DateTime<Utc>, recurrence: Recurrence) -> CatalogResult<()>;
    /// Returns `true` if a registration was removed.
    fn clear(&self, name: &str) -> CatalogResult<bool>;
}
