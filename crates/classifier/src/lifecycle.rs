//! Activation, subscription and teardown.
//!
//! - `activate` / `deactivate` manage the recurring sweep task registration
//! - `attach` subscribes the handlers to a dispatcher and returns an
//!   [`Installation`]; dropping or detaching it unsubscribes them

use std::sync::Arc;

use tracing::info;

use restock_catalog::Recurrence;
use restock_events::{CatalogEvent, EventKind, NotificationDispatcher, SubscriptionId};

use crate::classifier::RestockClassifier;
use crate::error::ClassifierError;
use crate::policy::ScheduleOn;

/// Live handler registrations of one classifier on one dispatcher.
#[derive(Debug)]
pub struct Installation {
    dispatcher: Arc<NotificationDispatcher>,
    subscriptions: Vec<SubscriptionId>,
}

impl Installation {
    pub fn subscriptions(&self) -> &[SubscriptionId] {
        &self.subscriptions
    }

    /// Unsubscribe every handler. Returns how many were still registered.
    pub fn detach(mut self) -> usize {
        self.unsubscribe_all()
    }

    fn unsubscribe_all(&mut self) -> usize {
        let removed = self
            .subscriptions
            .drain(..)
            .filter(|id| self.dispatcher.unsubscribe(*id))
            .count();
        if removed > 0 {
            info!(handlers = removed, "restock classifier detached");
        }
        removed
    }
}

impl Drop for Installation {
    fn drop(&mut self) {
        self.unsubscribe_all();
    }
}

impl RestockClassifier {
    /// Register the sweep task when the policy schedules on activation.
    ///
    /// Returns `true` if a registration was created.
    pub fn activate(&self) -> Result<bool, ClassifierError> {
        match self.policy.schedule_on {
            ScheduleOn::Activation => self.ensure_sweep_scheduled(),
            ScheduleOn::Startup => Ok(false),
        }
    }

    /// Remove the sweep task registration.
    pub fn deactivate(&self) -> Result<bool, ClassifierError> {
        let cleared = self.collab.scheduler.clear(&self.policy.sweep_task)?;
        if cleared {
            info!(task = %self.policy.sweep_task, "sweep task unscheduled");
        }
        Ok(cleared)
    }

    fn ensure_sweep_scheduled(&self) -> Result<bool, ClassifierError> {
        let task = &self.policy.sweep_task;
        if self.collab.scheduler.next_scheduled(task)?.is_some() {
            return Ok(false);
        }
        let first_run = self.collab.clock.now();
        self.collab
            .scheduler
            .schedule(task, first_run, Recurrence::Daily)?;
        info!(task = %task, first_run = %first_run, "sweep task scheduled");
        Ok(true)
    }

    /// Subscribe the handlers selected by the policy.
    pub fn attach(
        self: &Arc<Self>,
        dispatcher: &Arc<NotificationDispatcher>,
    ) -> Result<Installation, ClassifierError> {
        if self.policy.schedule_on == ScheduleOn::Startup {
            self.ensure_sweep_scheduled()?;
        }

        let mut subscriptions = Vec::new();
        let trigger = self.policy.publish_trigger;

        if trigger.on_transition() {
            let this = Arc::clone(self);
            subscriptions.push(dispatcher.subscribe(
                EventKind::StatusTransitioned,
                "restock.publish_transition",
                move |event| {
                    if let CatalogEvent::StatusTransitioned(e) = event {
                        this.on_status_transition(e)?;
                    }
                    Ok(())
                },
            ));
        }

        if trigger.on_published() {
            let this = Arc::clone(self);
            subscriptions.push(dispatcher.subscribe(
                EventKind::ItemPublished,
                "restock.item_published",
                move |event| {
                    if let CatalogEvent::ItemPublished(e) = event {
                        this.on_item_published(e)?;
                    }
                    Ok(())
                },
            ));
        }

        let this = Arc::clone(self);
        subscriptions.push(dispatcher.subscribe(
            EventKind::StockChanged,
            "restock.stock_changed",
            move |event| {
                if let CatalogEvent::StockChanged(e) = event {
                    this.on_stock_changed(e)?;
                }
                Ok(())
            },
        ));

        let this = Arc::clone(self);
        subscriptions.push(dispatcher.subscribe(
            EventKind::TaskDue,
            "restock.sweep",
            move |event| {
                if let CatalogEvent::TaskDue(e) = event {
                    if e.task == this.policy.sweep_task {
                        this.sweep()?;
                    }
                }
                Ok(())
            },
        ));

        info!(handlers = subscriptions.len(), trigger = ?trigger, "restock classifier attached");
        Ok(Installation {
            dispatcher: Arc::clone(dispatcher),
            subscriptions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    use restock_catalog::TaskScheduler;
    use restock_core::{ItemKind, ItemStatus};
    use restock_events::{ItemPublished, StatusTransitioned, TaskDue};

    use crate::policy::{PublishTrigger, RestockPolicy};
    use crate::testing::{Fixture, t0};

    #[test]
    fn activation_schedules_once_and_deactivation_clears() {
        let fx = Fixture::new();

        assert!(fx.classifier.activate().unwrap());
        assert!(!fx.classifier.activate().unwrap());
        assert_eq!(
            fx.scheduler.next_scheduled("clear_new_and_restocked").unwrap(),
            Some(t0())
        );

        assert!(fx.classifier.deactivate().unwrap());
        assert_eq!(fx.scheduler.next_scheduled("clear_new_and_restocked").unwrap(), None);
    }

    #[test]
    fn startup_policy_schedules_on_attach() {
        let fx = Fixture::with_policy(RestockPolicy {
            schedule_on: ScheduleOn::Startup,
            ..RestockPolicy::default()
        });
        let dispatcher = NotificationDispatcher::arc();

        assert!(!fx.classifier.activate().unwrap());
        assert!(fx.scheduler.tasks().is_empty());

        let _installation = fx.classifier.attach(&dispatcher).unwrap();
        assert_eq!(fx.scheduler.tasks().len(), 1);
    }

    #[test]
    fn subscriptions_follow_publish_trigger() {
        let dispatcher = NotificationDispatcher::arc();

        let transition_only = Fixture::new().classifier.attach(&dispatcher).unwrap();
        let kinds: Vec<_> = dispatcher.subscriptions().into_iter().map(|(_, k, _)| k).collect();
        assert_eq!(
            kinds,
            vec![EventKind::StatusTransitioned, EventKind::StockChanged, EventKind::TaskDue]
        );
        assert_eq!(transition_only.detach(), 3);
        assert!(dispatcher.is_empty());

        let both = Fixture::with_policy(RestockPolicy {
            publish_trigger: PublishTrigger::Both,
            ..RestockPolicy::default()
        });
        let installation = both.classifier.attach(&dispatcher).unwrap();
        assert_eq!(installation.subscriptions().len(), 4);

        drop(installation);
        assert!(dispatcher.is_empty());
    }

    #[test]
    fn dispatched_notifications_reach_handlers() {
        let fx = Fixture::with_policy(RestockPolicy {
            publish_trigger: PublishTrigger::Both,
            ..RestockPolicy::default()
        });
        let dispatcher = NotificationDispatcher::arc();
        let _installation = fx.classifier.attach(&dispatcher).unwrap();
        let item = fx.product(1, ItemStatus::Published);

        dispatcher.dispatch(&CatalogEvent::StatusTransitioned(StatusTransitioned {
            item_id: item,
            kind: ItemKind::Product,
            old_status: ItemStatus::Draft,
            new_status: ItemStatus::Published,
            occurred_at: Utc::now(),
        }));
        fx.clock.advance(Duration::hours(1));
        dispatcher.dispatch(&CatalogEvent::ItemPublished(ItemPublished {
            item_id: item,
            occurred_at: Utc::now(),
        }));
        assert_eq!(fx.tagged_at(item), Some(t0()));

        // Another task's due notification does not trigger the sweep.
        fx.clock.advance(Duration::days(6));
        dispatcher.dispatch(&CatalogEvent::TaskDue(TaskDue {
            task: "unrelated".to_string(),
            occurred_at: Utc::now(),
        }));
        assert!(fx.tagged(item));

        dispatcher.dispatch(&CatalogEvent::TaskDue(TaskDue {
            task: "clear_new_and_restocked".to_string(),
            occurred_at: Utc::now(),
        }));
        assert!(!fx.tagged(item));
    }
}
