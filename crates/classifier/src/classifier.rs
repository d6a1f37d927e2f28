use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use restock_catalog::{CatalogResult, ItemMeta};
use restock_core::{ItemId, TermId};
use restock_events::{ItemPublished, StatusTransitioned, StockChanged};

use crate::collaborators::Collaborators;
use crate::error::ClassifierError;
use crate::policy::RestockPolicy;
use crate::resolver::TermResolver;

/// What a publish notification did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PublishOutcome {
    Tagged { term: TermId, at: DateTime<Utc> },
    /// A tag timestamp was already present; nothing was re-stamped.
    AlreadyTagged,
    /// Not a product, or not a first move into published.
    NotApplicable,
    TermUnresolved,
}

/// What a stock notification did to the classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StockAction {
    /// 0 → positive edge.
    Tagged,
    /// Stock at or below zero.
    Untagged,
    Unchanged,
    /// A rule fired but the term could not be resolved.
    TermUnresolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StockOutcome {
    pub previous: Option<i64>,
    pub current: i64,
    pub action: StockAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StockRule {
    Restock,
    Depletion,
}

/// Tags new and restocked products; retracts the tag on depletion or expiry.
#[derive(Debug)]
pub struct RestockClassifier {
    pub(crate) policy: RestockPolicy,
    pub(crate) resolver: TermResolver,
    pub(crate) collab: Collaborators,
}

impl RestockClassifier {
    pub fn new(policy: RestockPolicy, collab: Collaborators) -> Result<Self, ClassifierError> {
        policy.validate()?;
        Ok(Self {
            resolver: TermResolver::from_policy(&policy),
            policy,
            collab,
        })
    }

    pub fn policy(&self) -> &RestockPolicy {
        &self.policy
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collab
    }

    pub fn resolve_term(&self) -> Option<TermId> {
        self.resolver.resolve(self.collab.taxonomy.as_ref())
    }

    pub(crate) fn meta(&self, item: ItemId) -> ItemMeta<'_> {
        ItemMeta::new(self.collab.metadata.as_ref(), item)
    }

    /// Handle a status transition; only a product's first move into published
    /// counts.
    pub fn on_status_transition(
        &self,
        event: &StatusTransitioned,
    ) -> Result<PublishOutcome, ClassifierError> {
        if !event.kind.is_product() || !event.is_first_publication() {
            return Ok(PublishOutcome::NotApplicable);
        }
        self.tag_new_item(event.item_id)
    }

    /// Handle the platform's dedicated "product published" notification.
    pub fn on_item_published(&self, event: &ItemPublished) -> Result<PublishOutcome, ClassifierError> {
        self.tag_new_item(event.item_id)
    }

    fn tag_new_item(&self, item: ItemId) -> Result<PublishOutcome, ClassifierError> {
        let meta = self.meta(item);
        if meta.tagged_at()?.is_some() {
            debug!(item = %item, "already tagged; publish ignored");
            return Ok(PublishOutcome::AlreadyTagged);
        }

        let Some(term) = self.resolve_term() else {
            return Ok(PublishOutcome::TermUnresolved);
        };

        let now = self.collab.clock.now();
        self.tag(item, term, now)?;
        info!(item = %item, term = %term, "tagged newly published item");
        Ok(PublishOutcome::Tagged { term, at: now })
    }

    /// Handle an inventory change.
    ///
    /// The previous-quantity marker is written even when a rule fails or the
    /// term cannot be resolved, so the next notification compares against the
    /// true last level.
    pub fn on_stock_changed(&self, event: &StockChanged) -> Result<StockOutcome, ClassifierError> {
        let item = event.item_id;
        let current = event.quantity;
        let meta = self.meta(item);
        let previous = meta.previous_quantity()?;

        let rule = if previous == Some(0) && current > 0 {
            Some(StockRule::Restock)
        } else if current <= 0 && self.policy.remove_on_depletion {
            Some(StockRule::Depletion)
        } else {
            None
        };

        let applied = match rule {
            None => Ok(StockAction::Unchanged),
            Some(rule) => self.apply_stock_rule(item, rule),
        };

        meta.set_previous_quantity(current)?;
        let action = applied?;

        debug!(item = %item, previous = ?previous, current, action = ?action, "stock change handled");
        Ok(StockOutcome {
            previous,
            current,
            action,
        })
    }

    fn apply_stock_rule(&self, item: ItemId, rule: StockRule) -> Result<StockAction, ClassifierError> {
        let Some(term) = self.resolve_term() else {
            return Ok(StockAction::TermUnresolved);
        };

        match rule {
            StockRule::Restock => {
                self.tag(item, term, self.collab.clock.now())?;
                info!(item = %item, term = %term, "tagged restocked item");
                Ok(StockAction::Tagged)
            }
            StockRule::Depletion => {
                self.untag(item, term)?;
                info!(item = %item, term = %term, "untagged depleted item");
                Ok(StockAction::Untagged)
            }
        }
    }

    pub(crate) fn tag(&self, item: ItemId, term: TermId, at: DateTime<Utc>) -> CatalogResult<()> {
        self.collab.taxonomy.attach(item, term)?;
        self.meta(item).set_tagged_at(at)
    }

    pub(crate) fn untag(&self, item: ItemId, term: TermId) -> CatalogResult<()> {
        self.collab.taxonomy.detach(item, term)?;
        self.meta(item).clear_tagged_at()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use restock_core::{ItemKind, ItemStatus};

    use crate::testing::{Fixture, t0};

    fn transition(item: ItemId, kind: ItemKind, old: ItemStatus, new: ItemStatus) -> StatusTransitioned {
        StatusTransitioned {
            item_id: item,
            kind,
            old_status: old,
            new_status: new,
            occurred_at: t0(),
        }
    }

    #[test]
    fn first_publication_tags_and_stamps() {
        let fx = Fixture::new();
        let item = fx.product(1, ItemStatus::Published);

        let outcome = fx
            .classifier
            .on_status_transition(&transition(item, ItemKind::Product, ItemStatus::Draft, ItemStatus::Published))
            .unwrap();

        assert_eq!(outcome, PublishOutcome::Tagged { term: fx.term, at: t0() });
        assert!(fx.tagged(item));
        assert_eq!(fx.tagged_at(item), Some(t0()));
    }

    #[test]
    fn republish_does_not_restamp() {
        let fx = Fixture::new();
        let item = fx.product(1, ItemStatus::Published);
        let ev = transition(item, ItemKind::Product, ItemStatus::Pending, ItemStatus::Published);

        fx.classifier.on_status_transition(&ev).unwrap();
        fx.clock.advance(Duration::hours(3));

        assert_eq!(
            fx.classifier.on_status_transition(&ev).unwrap(),
            PublishOutcome::AlreadyTagged
        );
        assert_eq!(
            fx.classifier
                .on_item_published(&ItemPublished { item_id: item, occurred_at: t0() })
                .unwrap(),
            PublishOutcome::AlreadyTagged
        );
        assert_eq!(fx.tagged_at(item), Some(t0()));
    }

    #[test]
    fn updates_and_non_products_are_ignored() {
        let fx = Fixture::new();
        let item = fx.product(1, ItemStatus::Published);
        let page = ItemId::new(2);
        fx.catalog.insert_item(page, ItemKind::Other, ItemStatus::Published);

        let update = transition(item, ItemKind::Product, ItemStatus::Published, ItemStatus::Published);
        let unpublish = transition(item, ItemKind::Product, ItemStatus::Published, ItemStatus::Draft);
        let other = transition(page, ItemKind::Other, ItemStatus::Draft, ItemStatus::Published);

        for ev in [update, unpublish, other] {
            assert_eq!(
                fx.classifier.on_status_transition(&ev).unwrap(),
                PublishOutcome::NotApplicable
            );
        }
        assert!(!fx.tagged(item));
        assert!(!fx.tagged(page));
    }

    #[test]
    fn missing_term_makes_publish_a_no_op() {
        let fx = Fixture::without_term();
        let item = fx.product(1, ItemStatus::Published);

        let outcome = fx
            .classifier
            .on_item_published(&ItemPublished { item_id: item, occurred_at: t0() })
            .unwrap();

        assert_eq!(outcome, PublishOutcome::TermUnresolved);
        assert_eq!(fx.tagged_at(item), None);
    }

    #[test]
    fn first_stock_event_never_tags() {
        let fx = Fixture::new();
        let item = fx.product(1, ItemStatus::Published);

        let outcome = fx.stock(item, 5);

        assert_eq!(outcome.previous, None);
        assert_eq!(outcome.action, StockAction::Unchanged);
        assert!(!fx.tagged(item));
        assert_eq!(fx.marker(item).as_deref(), Some("5"));
    }

    #[test]
    fn restock_edge_tags_only_from_recorded_zero() {
        let fx = Fixture::new();
        let item = fx.product(1, ItemStatus::Published);

        assert_eq!(fx.stock(item, 5).action, StockAction::Unchanged);
        assert_eq!(fx.stock(item, 0).action, StockAction::Untagged);
        fx.clock.advance(Duration::minutes(30));
        let outcome = fx.stock(item, 3);

        assert_eq!(outcome.previous, Some(0));
        assert_eq!(outcome.action, StockAction::Tagged);
        assert!(fx.tagged(item));
        assert_eq!(fx.tagged_at(item), Some(t0() + Duration::minutes(30)));

        // Positive → positive leaves the tag and its timestamp alone.
        fx.clock.advance(Duration::minutes(30));
        assert_eq!(fx.stock(item, 8).action, StockAction::Unchanged);
        assert_eq!(fx.tagged_at(item), Some(t0() + Duration::minutes(30)));
    }

    #[test]
    fn depletion_untags_and_clears_timestamp() {
        let fx = Fixture::new();
        let item = fx.product(1, ItemStatus::Published);
        fx.stock(item, 0);
        fx.stock(item, 3);
        assert!(fx.tagged(item));

        let outcome = fx.stock(item, 0);

        assert_eq!(outcome.action, StockAction::Untagged);
        assert!(!fx.tagged(item));
        assert_eq!(fx.tagged_at(item), None);
        assert_eq!(fx.marker(item).as_deref(), Some("0"));
    }

    #[test]
    fn negative_stock_counts_as_depleted_and_restocks_only_from_zero() {
        let fx = Fixture::new();
        let item = fx.product(1, ItemStatus::Published);
        fx.stock(item, 0);
        fx.stock(item, 4);

        assert_eq!(fx.stock(item, -2).action, StockAction::Untagged);
        assert_eq!(fx.stock(item, 6).action, StockAction::Unchanged);
        assert!(!fx.tagged(item));
    }

    #[test]
    fn depletion_rule_can_be_disabled() {
        let fx = Fixture::with_policy(RestockPolicy {
            remove_on_depletion: false,
            ..RestockPolicy::default()
        });
        let item = fx.product(1, ItemStatus::Published);
        fx.stock(item, 0);
        fx.stock(item, 2);

        assert_eq!(fx.stock(item, 0).action, StockAction::Unchanged);
        assert!(fx.tagged(item));
        assert_eq!(fx.tagged_at(item), Some(t0()));
    }

    #[test]
    fn malformed_marker_suppresses_restock() {
        let fx = Fixture::new();
        let item = fx.product(1, ItemStatus::Published);
        fx.set_marker(item, "");
        assert_eq!(fx.stock(item, 4).action, StockAction::Unchanged);

        fx.set_marker(item, "zero");
        assert_eq!(fx.stock(item, 4).action, StockAction::Unchanged);
        assert!(!fx.tagged(item));
    }

    #[test]
    fn marker_is_recorded_even_without_term() {
        let fx = Fixture::without_term();
        let item = fx.product(1, ItemStatus::Published);
        fx.stock(item, 0);

        let outcome = fx.stock(item, 9);

        assert_eq!(outcome.action, StockAction::TermUnresolved);
        assert_eq!(fx.marker(item).as_deref(), Some("9"));
    }
}
