//! Tracing and logging setup shared by the binaries.

/// Initialize process-wide tracing with JSON output.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Initialize process-wide tracing with the given configuration.
pub fn init_with(config: &ObservabilityConfig) {
    tracing::init_with(config);
}

/// Tracing configuration (filters, layers).
pub mod tracing;

pub use self::tracing::{LogFormat, ObservabilityConfig, UnknownLogFormat};
