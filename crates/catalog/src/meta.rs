//! Typed view over the two metadata entries the classifier owns.
//!
//! Values are persisted as decimal strings for compatibility with whatever
//! else on the platform reads them. Reads never fail on malformed content:
//! a value that does not parse is treated as absent.

use chrono::{DateTime, Utc};

use restock_core::ItemId;

use crate::error::CatalogResult;
use crate::ports::MetadataStore;

/// Epoch seconds at which the classification was last applied.
pub const TAGGED_AT_KEY: &str = "_new_and_restocked_time";

/// Last observed inventory quantity.
pub const PREVIOUS_QUANTITY_KEY: &str = "_prev_stock_qty";

/// Parse a stored tag timestamp. Empty, malformed or non-positive values are
/// absent.
pub fn parse_tagged_at(raw: &str) -> Option<DateTime<Utc>> {
    let secs = raw.trim().parse::<i64>().ok()?;
    if secs <= 0 {
        return None;
    }
    DateTime::from_timestamp(secs, 0)
}

/// Parse a stored previous-quantity marker. Empty or malformed values are
/// absent, which callers read as "not previously zero".
pub fn parse_previous_quantity(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<i64>().ok()
}

/// Metadata accessor bound to one item.
pub struct ItemMeta<'a> {
    store: &'a dyn MetadataStore,
    item: ItemId,
}

impl<'a> ItemMeta<'a> {
    pub fn new(store: &'a dyn MetadataStore, item: ItemId) -> Self {
        Self { store, item }
    }

    pub fn tagged_at(&self) -> CatalogResult<Option<DateTime<Utc>>> {
        let raw = self.store.get(self.item, TAGGED_AT_KEY)?;
        Ok(raw.as_deref().and_then(parse_tagged_at))
    }

    pub fn set_tagged_at(&self, at: DateTime<Utc>) -> CatalogResult<()> {
        self.store
            .set(self.item, TAGGED_AT_KEY, at.timestamp().to_string())
    }

    pub fn clear_tagged_at(&self) -> CatalogResult<()> {
        self.store.delete(self.item, TAGGED_AT_KEY)
    }

    pub fn previous_quantity(&self) -> CatalogResult<Option<i64>> {
        let raw = self.store.get(self.item, PREVIOUS_QUANTITY_KEY)?;
        Ok(raw.as_deref().and_then(parse_previous_quantity))
    }

    pub fn set_previous_quantity(&self, quantity: i64) -> CatalogResult<()> {
        self.store
            .set(self.item, PREVIOUS_QUANTITY_KEY, quantity.to_string())
    }
}
