use std::sync::Arc;

use anyhow::{Context, ensure};
use chrono::{DateTime, Duration, Utc};
use serde_json::{Value, json};
use tracing::info;

use restock_catalog::{
    InMemoryCatalog, InMemoryTaskScheduler, InMemoryTransientStore, MetadataStore, TAGGED_AT_KEY,
    TaxonomyStore,
};
use restock_classifier::{Collaborators, RestockClassifier, SweepOutcome};
use restock_core::{Clock, ItemId, ItemKind, ItemStatus, ManualClock, TermId};
use restock_events::{CatalogEvent, NotificationDispatcher, StatusTransitioned, StockChanged, TaskDue};
use restock_infra::RestockConfig;

/// 2023-11-14T22:13:20Z
const START_EPOCH: i64 = 1_700_000_000;

struct World {
    clock: Arc<ManualClock>,
    catalog: Arc<InMemoryCatalog>,
    classifier: Arc<RestockClassifier>,
    dispatcher: Arc<NotificationDispatcher>,
    term: TermId,
}

impl World {
    fn tagged(&self, item: ItemId) -> anyhow::Result<bool> {
        Ok(self.catalog.has_term(item, self.term)?)
    }

    fn tagged_at(&self, item: ItemId) -> anyhow::Result<Option<String>> {
        Ok(self.catalog.get(item, TAGGED_AT_KEY)?)
    }

    fn stock(&self, item: ItemId, quantity: i64) {
        self.dispatcher.dispatch(&CatalogEvent::StockChanged(StockChanged {
            item_id: item,
            quantity,
            occurred_at: self.clock.now(),
        }));
    }

    fn snapshot(&self, step: &str, item: ItemId) -> anyhow::Result<Value> {
        let tagged = self.tagged(item)?;
        let tagged_at = self.tagged_at(item)?;
        info!(step, item = %item, tagged, tagged_at = ?tagged_at, now = %self.clock.now(), "step");
        Ok(json!({ "step": step, "tagged": tagged, "tagged_at": tagged_at }))
    }
}

/// Publish, expire, then restock one product. Returns a per-step summary and
/// fails if the classification does not follow the expected lifecycle.
pub fn run(config: &RestockConfig) -> anyhow::Result<Value> {
    let start: DateTime<Utc> =
        DateTime::from_timestamp(START_EPOCH, 0).context("start time out of range")?;
    let clock = Arc::new(ManualClock::new(start));
    let catalog = InMemoryCatalog::arc();
    let term = catalog.define_term(&config.policy.term_label, &config.policy.taxonomy)?;
    let scheduler = InMemoryTaskScheduler::arc();
    let collab = Collaborators::in_memory(
        catalog.clone(),
        Arc::new(InMemoryTransientStore::new(clock.clone())),
        scheduler,
        clock.clone(),
    );

    let classifier = Arc::new(RestockClassifier::new(config.policy.clone(), collab)?);
    classifier.activate()?;
    let dispatcher = NotificationDispatcher::arc();
    let installation = classifier.attach(&dispatcher)?;

    let world = World {
        clock,
        catalog,
        classifier,
        dispatcher,
        term,
    };
    let item = ItemId::new(42);
    world
        .catalog
        .insert_item(item, ItemKind::Product, ItemStatus::Draft);
    let mut steps = Vec::new();

    world.catalog.set_status(item, ItemStatus::Published)?;
    world
        .dispatcher
        .dispatch(&CatalogEvent::StatusTransitioned(StatusTransitioned {
            item_id: item,
            kind: ItemKind::Product,
            old_status: ItemStatus::Draft,
            new_status: ItemStatus::Published,
            occurred_at: world.clock.now(),
        }));
    ensure!(world.tagged(item)?, "publishing did not tag the product");
    steps.push(world.snapshot("published", item)?);

    world
        .clock
        .advance(world.classifier.policy().dwell() + Duration::seconds(1));
    world.dispatcher.dispatch(&CatalogEvent::TaskDue(TaskDue {
        task: world.classifier.policy().sweep_task.clone(),
        occurred_at: world.clock.now(),
    }));
    ensure!(!world.tagged(item)?, "sweep did not expire the tag");
    steps.push(world.snapshot("swept", item)?);

    world.stock(item, 10);
    ensure!(!world.tagged(item)?, "first stock level must not tag");
    steps.push(world.snapshot("stock 10", item)?);

    world.stock(item, 0);
    steps.push(world.snapshot("stock 0", item)?);

    world.clock.advance(Duration::hours(1));
    world.stock(item, 7);
    ensure!(world.tagged(item)?, "restock from zero did not tag");
    steps.push(world.snapshot("stock 7", item)?);

    // A second sweep right away leaves the fresh tag in place.
    let outcome = world.classifier.sweep()?;
    ensure!(
        matches!(&outcome, SweepOutcome::Completed(report) if report.expired.is_empty()),
        "fresh tag was expired: {outcome:?}"
    );

    installation.detach();
    world.classifier.deactivate()?;

    Ok(json!({
        "term": config.policy.term_label,
        "item": item.get(),
        "steps": steps,
    }))
}
