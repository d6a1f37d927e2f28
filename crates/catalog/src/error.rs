use restock_core::{ItemId, TermId};

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Failure reported by a catalog collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("item not found: {0}")]
    ItemNotFound(ItemId),
    #[error("term not found: {0}")]
    TermNotFound(TermId),
    #[error("internal lock poisoned")]
    Poisoned,
    #[error("storage error: {0}")]
    Storage(String),
}

impl CatalogError {
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}
