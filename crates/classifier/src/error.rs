use thiserror::Error;

use restock_catalog::CatalogError;
use restock_core::DomainError;

/// Classifier failure.
///
/// Handlers surface these to the dispatcher, which logs and drops them; the
/// platform event that triggered a handler is never failed.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("invalid policy: {0}")]
    Policy(#[from] DomainError),

    #[error("malformed policy document: {0}")]
    PolicyDocument(String),

    #[error("lease encoding failed: {0}")]
    LeaseEncoding(String),
}
