//! Background threads feeding the notification dispatcher.

pub mod dispatch_worker;
pub mod task_runner;

pub use dispatch_worker::{DispatchWorker, WorkerHandle};
pub use task_runner::{DueTaskSource, RunnerStats, TaskRunner, TaskRunnerConfig, TaskRunnerHandle};
