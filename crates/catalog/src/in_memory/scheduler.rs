use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::error::{CatalogError, CatalogResult};
use crate::ports::{Recurrence, TaskScheduler};

/// One registered recurring task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    pub name: String,
    pub recurrence: Recurrence,
    pub next_run: DateTime<Utc>,
}

/// In-memory task registry with a pull-based "what is due" query.
#[derive(Debug, Default)]
pub struct InMemoryTaskScheduler {
    tasks: RwLock<BTreeMap<String, ScheduledTask>>,
}

impl InMemoryTaskScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn tasks(&self) -> Vec<ScheduledTask> {
        match self.tasks.read() {
            Ok(tasks) => tasks.values().cloned().collect(),
            Err(_) => vec![],
        }
    }

    /// Names of tasks whose next run is at or before `now`.
    ///
    /// Each due task fires once and its next run moves forward by whole
    /// intervals until it is in the future; missed runs are coalesced.
    pub fn take_due(&self, now: DateTime<Utc>) -> CatalogResult<Vec<String>> {
        let mut tasks = self.tasks.write().map_err(|_| CatalogError::Poisoned)?;
        let mut due = Vec::new();
        for task in tasks.values_mut() {
            if task.next_run > now {
                continue;
            }
            let period = task.recurrence.interval().num_seconds();
            let behind = (now - task.next_run).num_seconds() / period;
            let step = Duration::seconds(behind.saturating_add(1).saturating_mul(period));
            task.next_run = task
                .next_run
                .checked_add_signed(step)
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            debug!(task = %task.name, next_run = %task.next_run, "task due");
            due.push(task.name.clone());
        }
        Ok(due)
    }
}

impl TaskScheduler for InMemoryTaskScheduler {
    fn next_scheduled(&self, name: &str) -> CatalogResult<Option<DateTime<Utc>>> {
        let tasks = self.tasks.read().map_err(|_| CatalogError::Poisoned)?;
        Ok(tasks.get(name).map(|t| t.next_run))
    }

    fn schedule(&self, name: &str, first_run: DateTime<Utc>, recurrence: Recurrence) -> CatalogResult<()> {
        let mut tasks = self.tasks.write().map_err(|_| CatalogError::Poisoned)?;
        tasks.insert(
            name.to_string(),
            ScheduledTask {
                name: name.to_string(),
                recurrence,
                next_run: first_run,
            },
        );
        Ok(())
    }

    fn clear(&self, name: &str) -> CatalogResult<bool> {
        let mut tasks = self.tasks.write().map_err(|_| CatalogError::Poisoned)?;
        Ok(tasks.remove(name).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_task_fires_once_and_reschedules() {
        let scheduler = InMemoryTaskScheduler::new();
        let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        scheduler.schedule("daily", start, Recurrence::Daily).unwrap();

        assert!(scheduler.take_due(start - Duration::seconds(1)).unwrap().is_empty());
        assert_eq!(scheduler.take_due(start).unwrap(), vec!["daily".to_string()]);
        assert!(scheduler.take_due(start).unwrap().is_empty());
        assert_eq!(
            scheduler.next_scheduled("daily").unwrap(),
            Some(start + Duration::days(1))
        );
    }

    #[test]
    fn missed_runs_are_coalesced() {
        let scheduler = InMemoryTaskScheduler::new();
        let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        scheduler.schedule("daily", start, Recurrence::Daily).unwrap();

        let later = start + Duration::days(3) + Duration::hours(2);
        assert_eq!(scheduler.take_due(later).unwrap().len(), 1);
        assert_eq!(
            scheduler.next_scheduled("daily").unwrap(),
            Some(start + Duration::days(4))
        );
    }

    #[test]
    fn ancient_hourly_registration_catches_up_in_one_step() {
        let scheduler = InMemoryTaskScheduler::new();
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        // More than i32::MAX whole hours behind.
        scheduler
            .schedule("hourly", DateTime::<Utc>::MIN_UTC, Recurrence::Hourly)
            .unwrap();

        assert_eq!(scheduler.take_due(now).unwrap(), vec!["hourly".to_string()]);
        let next = scheduler.next_scheduled("hourly").unwrap().unwrap();
        assert!(next > now && next <= now + Duration::hours(1));
        assert!(scheduler.take_due(now).unwrap().is_empty());
    }

    #[test]
    fn clear_reports_removal() {
        let scheduler = InMemoryTaskScheduler::new();
        scheduler.schedule("daily", Utc::now(), Recurrence::Daily).unwrap();
        assert!(scheduler.clear("daily").unwrap());
        assert!(!scheduler.clear("daily").unwrap());
        assert_eq!(scheduler.next_scheduled("daily").unwrap(), None);
    }
}
