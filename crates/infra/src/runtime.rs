//! In-process restock runtime.
//!
//! Wires the classifier, the dispatcher, a bus, the dispatch worker and the
//! task runner. The host platform feeds notifications through
//! [`RestockRuntime::publish`]; due sweeps arrive from the runner.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, anyhow};
use tracing::info;

use restock_classifier::{Collaborators, Installation, RestockClassifier};
use restock_events::{CatalogEvent, EventBus, EventEnvelope, InMemoryEventBus, NotificationDispatcher};

use crate::config::RestockConfig;
use crate::workers::{DispatchWorker, DueTaskSource, RunnerStats, TaskRunner, TaskRunnerConfig, TaskRunnerHandle, WorkerHandle};

type Bus = InMemoryEventBus<EventEnvelope<CatalogEvent>>;

/// `source` of envelopes published through [`RestockRuntime::publish`].
pub const PLATFORM_SOURCE: &str = "catalog";

/// Production wiring uses the wall clock; tests substitute a `ManualClock`.
///
/// ```
/// use std::sync::Arc;
///
/// use restock_catalog::{InMemoryCatalog, InMemoryTaskScheduler, InMemoryTransientStore};
/// use restock_classifier::Collaborators;
/// use restock_core::{Clock, SystemClock};
/// use restock_infra::{RestockConfig, RestockRuntime};
///
/// # fn main() -> anyhow::Result<()> {
/// let clock: Arc<dyn Clock> = Arc::new(SystemClock);
/// let scheduler = InMemoryTaskScheduler::arc();
/// let collab = Collaborators::in_memory(
///     InMemoryCatalog::arc(),
///     Arc::new(InMemoryTransientStore::new(clock.clone())),
///     scheduler.clone(),
///     clock,
/// );
///
/// let runtime = RestockRuntime::start(&RestockConfig::default(), collab, scheduler)?;
/// assert!(!runtime.dispatcher().is_empty());
/// runtime.shutdown();
/// # Ok(())
/// # }
/// ```
pub struct RestockRuntime {
    bus: Arc<Bus>,
    dispatcher: Arc<NotificationDispatcher>,
    classifier: Arc<RestockClassifier>,
    sequence: AtomicU64,
    installation: Option<Installation>,
    worker: Option<WorkerHandle>,
    runner: Option<TaskRunnerHandle>,
}

impl RestockRuntime {
    /// Activate the classifier, subscribe its handlers and start both threads.
    pub fn start(
        config: &RestockConfig,
        collab: Collaborators,
        due_tasks: Arc<dyn DueTaskSource>,
    ) -> anyhow::Result<Self> {
        let clock = collab.clock.clone();
        let classifier = Arc::new(
            RestockClassifier::new(config.policy.clone(), collab).context("invalid restock policy")?,
        );
        classifier
            .activate()
            .context("failed to register the sweep task")?;

        let dispatcher = NotificationDispatcher::arc();
        let installation = classifier
            .attach(&dispatcher)
            .context("failed to attach restock handlers")?;

        let bus: Arc<Bus> = Arc::new(InMemoryEventBus::new());
        let worker = DispatchWorker::spawn("restock-dispatch", bus.clone(), dispatcher.clone())
            .context("failed to spawn dispatch worker")?;
        let runner = TaskRunner::new(due_tasks, clock, bus.clone())
            .spawn(
                TaskRunnerConfig::default()
                    .with_name("restock-tasks")
                    .with_poll_interval(config.poll_interval),
            )
            .context("failed to spawn task runner")?;

        info!(
            term = %config.policy.term_label,
            taxonomy = %config.policy.taxonomy,
            handlers = installation.subscriptions().len(),
            "restock runtime started"
        );

        Ok(Self {
            bus,
            dispatcher,
            classifier,
            sequence: AtomicU64::new(0),
            installation: Some(installation),
            worker: Some(worker),
            runner: Some(runner),
        })
    }

    /// Queue a platform notification for the dispatch worker.
    pub fn publish(&self, event: CatalogEvent) -> anyhow::Result<()> {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        self.bus
            .publish(EventEnvelope::wrap(PLATFORM_SOURCE, seq, event))
            .map_err(|e| anyhow!("failed to publish notification: {e:?}"))
    }

    pub fn classifier(&self) -> &Arc<RestockClassifier> {
        &self.classifier
    }

    pub fn dispatcher(&self) -> &Arc<NotificationDispatcher> {
        &self.dispatcher
    }

    pub fn runner_stats(&self) -> Option<RunnerStats> {
        self.runner.as_ref().map(TaskRunnerHandle::stats)
    }

    /// Stop the runner, drain the dispatch worker and unsubscribe the
    /// handlers. The sweep task registration is kept; call
    /// `classifier().deactivate()` to remove it.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(runner) = self.runner.take() {
            runner.shutdown();
        }
        if let Some(worker) = self.worker.take() {
            worker.shutdown();
        }
        if let Some(installation) = self.installation.take() {
            installation.detach();
            info!("restock runtime stopped");
        }
    }
}

impl Drop for RestockRuntime {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::{Duration, Instant};

    use chrono::{DateTime, Utc};
    use restock_catalog::{
        InMemoryCatalog, InMemoryTaskScheduler, InMemoryTransientStore, MetadataStore,
        TAGGED_AT_KEY, TaskScheduler, TaxonomyStore,
    };
    use restock_classifier::RestockPolicy;
    use restock_core::{Clock, ItemId, ItemKind, ItemStatus, ManualClock, TermId};
    use restock_events::{StatusTransitioned, StockChanged};

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn wait_until(mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if done() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        done()
    }

    struct Platform {
        clock: Arc<ManualClock>,
        catalog: Arc<InMemoryCatalog>,
        scheduler: Arc<InMemoryTaskScheduler>,
        term: TermId,
        runtime: RestockRuntime,
    }

    fn start() -> Platform {
        let config = RestockConfig {
            poll_interval: Duration::from_millis(10),
            ..RestockConfig::default()
        };
        let clock = Arc::new(ManualClock::new(t0()));
        let catalog = InMemoryCatalog::arc();
        let term = catalog
            .define_term(&config.policy.term_label, &config.policy.taxonomy)
            .unwrap();
        let scheduler = InMemoryTaskScheduler::arc();
        let collab = Collaborators::in_memory(
            catalog.clone(),
            Arc::new(InMemoryTransientStore::new(clock.clone())),
            scheduler.clone(),
            clock.clone(),
        );
        let runtime = RestockRuntime::start(&config, collab, scheduler.clone()).unwrap();
        Platform {
            clock,
            catalog,
            scheduler,
            term,
            runtime,
        }
    }

    fn publish(p: &Platform, item: ItemId) {
        p.catalog.set_status(item, ItemStatus::Published).unwrap();
        p.runtime
            .publish(CatalogEvent::StatusTransitioned(StatusTransitioned {
                item_id: item,
                kind: ItemKind::Product,
                old_status: ItemStatus::Draft,
                new_status: ItemStatus::Published,
                occurred_at: p.clock.now(),
            }))
            .unwrap();
    }

    #[test]
    fn notifications_and_scheduled_sweep_flow_through_threads() {
        let p = start();
        let item = ItemId::new(7);
        p.catalog.insert_item(item, ItemKind::Product, ItemStatus::Draft);

        assert!(p
            .scheduler
            .next_scheduled(RestockPolicy::DEFAULT_SWEEP_TASK)
            .unwrap()
            .is_some());

        publish(&p, item);
        assert!(wait_until(|| p.catalog.has_term(item, p.term).unwrap()));
        assert_eq!(
            p.catalog.get(item, TAGGED_AT_KEY).unwrap(),
            Some(t0().timestamp().to_string())
        );

        p.clock.advance(chrono::Duration::days(6));
        assert!(wait_until(|| !p.catalog.has_term(item, p.term).unwrap()));
        assert_eq!(p.catalog.get(item, TAGGED_AT_KEY).unwrap(), None);
        assert!(p.runtime.runner_stats().unwrap().tasks_fired >= 2);
    }

    #[test]
    fn shutdown_delivers_queued_notifications_and_unsubscribes() {
        let p = start();
        let item = ItemId::new(1);
        p.catalog.insert_item(item, ItemKind::Product, ItemStatus::Published);

        for quantity in [5, 0, 3] {
            p.runtime
                .publish(CatalogEvent::StockChanged(StockChanged {
                    item_id: item,
                    quantity,
                    occurred_at: p.clock.now(),
                }))
                .unwrap();
        }

        let dispatcher = p.runtime.dispatcher().clone();
        let classifier = p.runtime.classifier().clone();
        p.runtime.shutdown();

        assert!(p.catalog.has_term(item, p.term).unwrap());
        assert!(dispatcher.is_empty());

        assert!(classifier.deactivate().unwrap());
        assert!(p.scheduler.tasks().is_empty());
    }
}
