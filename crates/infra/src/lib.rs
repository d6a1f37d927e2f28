//! Infrastructure layer: configuration, background workers and the
//! in-process runtime.

pub mod config;
pub mod runtime;
pub mod workers;

pub use config::{ConfigError, RestockConfig};
pub use runtime::RestockRuntime;
pub use workers::{
    DispatchWorker, DueTaskSource, RunnerStats, TaskRunner, TaskRunnerConfig, TaskRunnerHandle,
    WorkerHandle,
};
