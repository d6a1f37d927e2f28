//! Process configuration read from the environment.
//!
//! Every variable is optional. Unset variables keep the policy defaults;
//! `RESTOCK_POLICY_JSON` (a full policy document) is applied first and the
//! individual variables override it.

use std::collections::HashMap;
use std::time::Duration;

use restock_classifier::{ClassifierError, RestockPolicy};
use restock_core::DomainError;
use restock_observability::{LogFormat, ObservabilityConfig};

pub const ENV_POLICY_JSON: &str = "RESTOCK_POLICY_JSON";
pub const ENV_TERM_LABEL: &str = "RESTOCK_TERM_LABEL";
pub const ENV_TAXONOMY: &str = "RESTOCK_TAXONOMY";
pub const ENV_DWELL_SECS: &str = "RESTOCK_DWELL_SECS";
pub const ENV_LOCK_TTL_SECS: &str = "RESTOCK_LOCK_TTL_SECS";
pub const ENV_REMOVE_ON_DEPLETION: &str = "RESTOCK_REMOVE_ON_DEPLETION";
pub const ENV_SWEEP_LOCK: &str = "RESTOCK_SWEEP_LOCK";
pub const ENV_SCHEDULE_ON: &str = "RESTOCK_SCHEDULE_ON";
pub const ENV_PUBLISH_TRIGGER: &str = "RESTOCK_PUBLISH_TRIGGER";
pub const ENV_POLL_INTERVAL_MS: &str = "RESTOCK_POLL_INTERVAL_MS";
pub const ENV_LOG_FORMAT: &str = "RESTOCK_LOG_FORMAT";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid policy document in RESTOCK_POLICY_JSON: {0}")]
    PolicyDocument(#[source] ClassifierError),

    #[error("invalid policy: {0}")]
    Policy(#[from] DomainError),
}

impl ConfigError {
    fn invalid(key: &'static str, value: &str, reason: impl ToString) -> Self {
        Self::Invalid {
            key,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Everything a restock process needs at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestockConfig {
    pub policy: RestockPolicy,
    /// How often the task runner checks for due tasks.
    pub poll_interval: Duration,
    pub observability: ObservabilityConfig,
}

impl Default for RestockConfig {
    fn default() -> Self {
        Self {
            policy: RestockPolicy::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            observability: ObservabilityConfig::default(),
        }
    }
}

impl RestockConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &'static str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self::default();

        if let Some(doc) = get(ENV_POLICY_JSON) {
            config.policy = RestockPolicy::from_json(&doc).map_err(ConfigError::PolicyDocument)?;
        }

        let policy = &mut config.policy;
        if let Some(v) = get(ENV_TERM_LABEL) {
            policy.term_label = v;
        }
        if let Some(v) = get(ENV_TAXONOMY) {
            policy.taxonomy = v;
        }
        if let Some(v) = get(ENV_DWELL_SECS) {
            policy.dwell_secs = v
                .parse()
                .map_err(|e| ConfigError::invalid(ENV_DWELL_SECS, &v, e))?;
        }
        if let Some(v) = get(ENV_LOCK_TTL_SECS) {
            policy.lock_ttl_secs = v
                .parse()
                .map_err(|e| ConfigError::invalid(ENV_LOCK_TTL_SECS, &v, e))?;
        }
        if let Some(v) = get(ENV_REMOVE_ON_DEPLETION) {
            policy.remove_on_depletion = parse_flag(ENV_REMOVE_ON_DEPLETION, &v)?;
        }
        if let Some(v) = get(ENV_SWEEP_LOCK) {
            policy.sweep_lock = parse_flag(ENV_SWEEP_LOCK, &v)?;
        }
        if let Some(v) = get(ENV_SCHEDULE_ON) {
            policy.schedule_on = v
                .parse()
                .map_err(|e| ConfigError::invalid(ENV_SCHEDULE_ON, &v, e))?;
        }
        if let Some(v) = get(ENV_PUBLISH_TRIGGER) {
            policy.publish_trigger = v
                .parse()
                .map_err(|e| ConfigError::invalid(ENV_PUBLISH_TRIGGER, &v, e))?;
        }
        policy.validate()?;

        if let Some(v) = get(ENV_POLL_INTERVAL_MS) {
            let ms: u64 = v
                .parse()
                .map_err(|e| ConfigError::invalid(ENV_POLL_INTERVAL_MS, &v, e))?;
            if ms == 0 {
                return Err(ConfigError::invalid(ENV_POLL_INTERVAL_MS, &v, "must be positive"));
            }
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(v) = get(ENV_LOG_FORMAT) {
            let format: LogFormat = v
                .parse()
                .map_err(|e| ConfigError::invalid(ENV_LOG_FORMAT, &v, e))?;
            config.observability = config.observability.with_format(format);
        }

        Ok(config)
    }

    /// Convenience for tests and embedding.
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| vars.get(key).cloned())
    }
}

fn parse_flag(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(key, raw, "expected a boolean")),
    }
}
