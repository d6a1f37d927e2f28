//! Notifications delivered by the catalog platform.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use restock_core::{ItemId, ItemKind, ItemStatus};

use crate::Event;

/// Event: an item moved between lifecycle statuses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTransitioned {
    pub item_id: ItemId,
    pub kind: ItemKind,
    pub old_status: ItemStatus,
    pub new_status: ItemStatus,
    pub occurred_at: DateTime<Utc>,
}

impl StatusTransitioned {
    /// True only for a first move into published (not an update of an
    /// already-published item).
    pub fn is_first_publication(&self) -> bool {
        !self.old_status.is_published() && self.new_status.is_published()
    }
}

/// Event: a product was published (fired once per item by the platform).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPublished {
    pub item_id: ItemId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: the stored inventory quantity of an item was set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockChanged {
    pub item_id: ItemId,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: a named recurring task is due.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDue {
    pub task: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CatalogEvent {
    StatusTransitioned(StatusTransitioned),
    ItemPublished(ItemPublished),
    StockChanged(StockChanged),
    TaskDue(TaskDue),
}

/// Discriminant used to route notifications to subscribed handlers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    StatusTransitioned,
    ItemPublished,
    StockChanged,
    TaskDue,
}

impl CatalogEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            CatalogEvent::StatusTransitioned(_) => EventKind::StatusTransitioned,
            CatalogEvent::ItemPublished(_) => EventKind::ItemPublished,
            CatalogEvent::StockChanged(_) => EventKind::StockChanged,
            CatalogEvent::TaskDue(_) => EventKind::TaskDue,
        }
    }
}

impl Event for CatalogEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CatalogEvent::StatusTransitioned(_) => "catalog.item.status_transitioned",
            CatalogEvent::ItemPublished(_) => "catalog.item.published",
            CatalogEvent::StockChanged(_) => "catalog.item.stock_changed",
            CatalogEvent::TaskDue(_) => "scheduler.task.due",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CatalogEvent::StatusTransitioned(e) => e.occurred_at,
            CatalogEvent::ItemPublished(e) => e.occurred_at,
            CatalogEvent::StockChanged(e) => e.occurred_at,
            CatalogEvent::TaskDue(e) => e.occurred_at,
        }
    }
}
