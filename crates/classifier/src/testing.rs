//! Shared test fixture: in-memory collaborators, a manual clock and a defined
//! classification term.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use restock_catalog::{
    InMemoryCatalog, InMemoryTaskScheduler, InMemoryTransientStore, MetadataStore,
    PREVIOUS_QUANTITY_KEY, TAGGED_AT_KEY, TaxonomyStore,
};
use restock_core::{ItemId, ItemKind, ItemStatus, ManualClock, TermId};
use restock_events::StockChanged;

use crate::classifier::{RestockClassifier, StockOutcome};
use crate::collaborators::Collaborators;
use crate::policy::RestockPolicy;

pub(crate) fn t0() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

pub(crate) struct Fixture {
    pub clock: Arc<ManualClock>,
    pub catalog: Arc<InMemoryCatalog>,
    pub transients: Arc<InMemoryTransientStore>,
    pub scheduler: Arc<InMemoryTaskScheduler>,
    pub term: TermId,
    pub classifier: Arc<RestockClassifier>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_policy(RestockPolicy::default())
    }

    pub fn with_policy(policy: RestockPolicy) -> Self {
        Self::build(policy, true)
    }

    /// The classification term is never defined on the platform.
    pub fn without_term() -> Self {
        Self::build(RestockPolicy::default(), false)
    }

    fn build(policy: RestockPolicy, define_term: bool) -> Self {
        let clock = Arc::new(ManualClock::new(t0()));
        let catalog = InMemoryCatalog::arc();
        let transients = Arc::new(InMemoryTransientStore::new(clock.clone()));
        let scheduler = InMemoryTaskScheduler::arc();

        // Another term occupies id 1 so a defined classification never
        // coincides with the first id by accident.
        catalog.define_term("featured", &policy.taxonomy).unwrap();
        let term = if define_term {
            catalog.define_term(&policy.term_label, &policy.taxonomy).unwrap()
        } else {
            catalog.define_term("unrelated", &policy.taxonomy).unwrap()
        };

        let collab = Collaborators::in_memory(
            catalog.clone(),
            transients.clone(),
            scheduler.clone(),
            clock.clone(),
        );
        let classifier = Arc::new(RestockClassifier::new(policy, collab).unwrap());

        Self {
            clock,
            catalog,
            transients,
            scheduler,
            term,
            classifier,
        }
    }

    pub fn product(&self, id: u64, status: ItemStatus) -> ItemId {
        let item = ItemId::new(id);
        self.catalog.insert_item(item, ItemKind::Product, status);
        item
    }

    pub fn tagged(&self, item: ItemId) -> bool {
        self.catalog.has_term(item, self.term).unwrap()
    }

    pub fn tagged_at(&self, item: ItemId) -> Option<DateTime<Utc>> {
        self.catalog
            .get(item, TAGGED_AT_KEY)
            .unwrap()
            .and_then(|raw| raw.parse::<i64>().ok())
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }

    /// Tag `item` directly, as if it had been tagged at `at`.
    pub fn tag_at(&self, item: ItemId, at: DateTime<Utc>) {
        self.catalog.attach(item, self.term).unwrap();
        self.catalog
            .set(item, TAGGED_AT_KEY, at.timestamp().to_string())
            .unwrap();
    }

    pub fn marker(&self, item: ItemId) -> Option<String> {
        self.catalog.get(item, PREVIOUS_QUANTITY_KEY).unwrap()
    }

    pub fn set_marker(&self, item: ItemId, raw: &str) {
        self.catalog
            .set(item, PREVIOUS_QUANTITY_KEY, raw.to_string())
            .unwrap();
    }

    pub fn stock(&self, item: ItemId, quantity: i64) -> StockOutcome {
        self.classifier
            .on_stock_changed(&StockChanged {
                item_id: item,
                quantity,
                occurred_at: self.clock_now(),
            })
            .unwrap()
    }

    fn clock_now(&self) -> DateTime<Utc> {
        use restock_core::Clock;
        self.clock.now()
    }
}
