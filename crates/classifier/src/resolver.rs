use tracing::{debug, warn};

use restock_catalog::TaxonomyStore;
use restock_core::TermId;

use crate::policy::RestockPolicy;

/// Looks up the classification term by its fixed label.
///
/// Resolution happens on every handler invocation; the term is owned by the
/// platform and may be deleted or recreated at any time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermResolver {
    label: String,
    taxonomy: String,
}

impl TermResolver {
    pub fn new(label: impl Into<String>, taxonomy: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            taxonomy: taxonomy.into(),
        }
    }

    pub fn from_policy(policy: &RestockPolicy) -> Self {
        Self::new(policy.term_label.clone(), policy.taxonomy.clone())
    }

    /// `None` when the term does not exist or the lookup failed.
    pub fn resolve(&self, store: &dyn TaxonomyStore) -> Option<TermId> {
        match store.term_by_label(&self.label, &self.taxonomy) {
            Ok(Some(term)) => Some(term),
            Ok(None) => {
                debug!(label = %self.label, taxonomy = %self.taxonomy, "classification term not defined");
                None
            }
            Err(err) => {
                warn!(label = %self.label, taxonomy = %self.taxonomy, error = %err, "term lookup failed");
                None
            }
        }
    }
}
