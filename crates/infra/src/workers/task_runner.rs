//! Recurring task runner.
//!
//! Polls a [`DueTaskSource`] on a fixed interval and publishes a
//! [`TaskDue`] envelope for every task whose run time has arrived. Missed
//! runs are coalesced by the source, so a stalled runner fires once on
//! recovery rather than replaying every missed day.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use restock_catalog::{CatalogResult, InMemoryTaskScheduler};
use restock_core::Clock;
use restock_events::{CatalogEvent, EventBus, EventEnvelope, TaskDue};

/// Source of recurring tasks that have come due.
pub trait DueTaskSource: Send + Sync {
    /// Names of the tasks due at `now`, advancing each past `now`.
    fn take_due(&self, now: DateTime<Utc>) -> CatalogResult<Vec<String>>;
}

impl DueTaskSource for InMemoryTaskScheduler {
    fn take_due(&self, now: DateTime<Utc>) -> CatalogResult<Vec<String>> {
        InMemoryTaskScheduler::take_due(self, now)
    }
}

#[derive(Debug, Clone)]
pub struct TaskRunnerConfig {
    /// How often to poll for due tasks
    pub poll_interval: Duration,
    /// Name for logging and the thread
    pub name: String,
    /// `source` field of the published envelopes
    pub source: String,
}

impl Default for TaskRunnerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            name: "task-runner".to_string(),
            source: "scheduler".to_string(),
        }
    }
}

impl TaskRunnerConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Runner statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunnerStats {
    pub polls: u64,
    pub tasks_fired: u64,
    pub poll_failures: u64,
    pub publish_failures: u64,
    pub uptime_secs: u64,
}

/// Handle to control a running task runner.
#[derive(Debug)]
pub struct TaskRunnerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
    stats: Arc<Mutex<RunnerStats>>,
}

impl TaskRunnerHandle {
    /// Request graceful shutdown.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }

    pub fn stats(&self) -> RunnerStats {
        self.stats
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

/// Fires due tasks onto a bus.
pub struct TaskRunner<B> {
    source: Arc<dyn DueTaskSource>,
    clock: Arc<dyn Clock>,
    bus: B,
    sequence: u64,
}

impl<B> TaskRunner<B>
where
    B: EventBus<EventEnvelope<CatalogEvent>> + 'static,
{
    pub fn new(source: Arc<dyn DueTaskSource>, clock: Arc<dyn Clock>, bus: B) -> Self {
        Self {
            source,
            clock,
            bus,
            sequence: 0,
        }
    }

    /// Poll once and publish every due task. Returns the fired task names.
    pub fn run_once(&mut self, config: &TaskRunnerConfig, stats: &mut RunnerStats) -> Vec<String> {
        let now = self.clock.now();
        stats.polls += 1;

        let due = match self.source.take_due(now) {
            Ok(due) => due,
            Err(err) => {
                stats.poll_failures += 1;
                error!(runner = %config.name, error = %err, "failed to poll due tasks");
                return Vec::new();
            }
        };

        let mut fired = Vec::with_capacity(due.len());
        for task in due {
            self.sequence += 1;
            let envelope = EventEnvelope::wrap(
                config.source.clone(),
                self.sequence,
                CatalogEvent::TaskDue(TaskDue {
                    task: task.clone(),
                    occurred_at: now,
                }),
            );
            match self.bus.publish(envelope) {
                Ok(()) => {
                    stats.tasks_fired += 1;
                    debug!(runner = %config.name, task = %task, "task fired");
                    fired.push(task);
                }
                Err(err) => {
                    stats.publish_failures += 1;
                    warn!(runner = %config.name, task = %task, error = ?err, "failed to publish due task");
                }
            }
        }
        fired
    }

    /// Spawn the runner in a background thread.
    pub fn spawn(self, config: TaskRunnerConfig) -> std::io::Result<TaskRunnerHandle> {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let stats = Arc::new(Mutex::new(RunnerStats::default()));
        let stats_clone = stats.clone();

        let join = thread::Builder::new()
            .name(config.name.clone())
            .spawn(move || runner_loop(self, config, shutdown_rx, stats_clone))?;

        Ok(TaskRunnerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
            stats,
        })
    }
}

fn runner_loop<B>(
    mut runner: TaskRunner<B>,
    config: TaskRunnerConfig,
    shutdown_rx: mpsc::Receiver<()>,
    stats: Arc<Mutex<RunnerStats>>,
) where
    B: EventBus<EventEnvelope<CatalogEvent>> + 'static,
{
    info!(runner = %config.name, interval_ms = config.poll_interval.as_millis() as u64, "task runner started");
    let start_time = Instant::now();

    loop {
        {
            let mut s = stats.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            runner.run_once(&config, &mut s);
            s.uptime_secs = start_time.elapsed().as_secs();
        }

        // The shutdown channel doubles as the sleep.
        match shutdown_rx.recv_timeout(config.poll_interval) {
            Err(RecvTimeoutError::Timeout) => continue,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    info!(runner = %config.name, "task runner stopped");
}
