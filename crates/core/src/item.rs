//! Catalog item vocabulary shared by notifications and collaborator queries.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a catalog item on the host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Draft,
    Pending,
    Private,
    Future,
    Published,
    Trash,
}

impl ItemStatus {
    pub fn is_published(self) -> bool {
        self == ItemStatus::Published
    }
}

/// Kind of content record. Only products are classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Product,
    ProductVariation,
    Other,
}

impl ItemKind {
    pub fn is_product(self) -> bool {
        self == ItemKind::Product
    }
}
