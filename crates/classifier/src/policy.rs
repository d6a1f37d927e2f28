//! Classifier policy (what to tag, for how long, and which rules are on).

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use restock_core::{DomainError, DomainResult};

use crate::error::ClassifierError;

/// Where the daily sweep task gets registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleOn {
    /// Once, when the classifier is activated (and cleared on deactivation).
    Activation,
    /// On every start, if not already registered.
    Startup,
}

/// Which publish notification drives tagging of new items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishTrigger {
    /// Status transitions into published.
    Transition,
    /// The dedicated "item published" notification.
    Published,
    /// Both. Safe because tagging on publish is idempotent.
    Both,
}

impl PublishTrigger {
    pub fn on_transition(self) -> bool {
        matches!(self, PublishTrigger::Transition | PublishTrigger::Both)
    }

    pub fn on_published(self) -> bool {
        matches!(self, PublishTrigger::Published | PublishTrigger::Both)
    }
}

impl FromStr for ScheduleOn {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "activation" => Ok(Self::Activation),
            "startup" => Ok(Self::Startup),
            other => Err(DomainError::validation(format!(
                "unknown schedule registration point: {other}"
            ))),
        }
    }
}

impl FromStr for PublishTrigger {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "transition" => Ok(Self::Transition),
            "published" => Ok(Self::Published),
            "both" => Ok(Self::Both),
            other => Err(DomainError::validation(format!("unknown publish trigger: {other}"))),
        }
    }
}

/// Classifier configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestockPolicy {
    /// Label of the classification term (looked up, never created).
    pub term_label: String,
    /// Taxonomy the term lives in.
    pub taxonomy: String,
    /// Tag age after which the sweep retracts it.
    pub dwell_secs: u64,
    /// Sweep lease expiry (crash safety net).
    pub lock_ttl_secs: u64,
    /// Retract the tag as soon as stock drops to zero or below.
    pub remove_on_depletion: bool,
    /// Guard the sweep with a lease so overlapping runs skip.
    pub sweep_lock: bool,
    pub schedule_on: ScheduleOn,
    pub publish_trigger: PublishTrigger,
    /// Name of the recurring sweep task.
    pub sweep_task: String,
    /// Transient key holding the sweep lease.
    pub lock_key: String,
}

impl RestockPolicy {
    pub const DEFAULT_TERM_LABEL: &'static str = "new-and-restocked";
    pub const DEFAULT_TAXONOMY: &'static str = "product_cat";
    pub const DEFAULT_DWELL_SECS: u64 = 5 * 24 * 60 * 60;
    pub const DEFAULT_LOCK_TTL_SECS: u64 = 10 * 60;
    pub const DEFAULT_SWEEP_TASK: &'static str = "clear_new_and_restocked";
    pub const DEFAULT_LOCK_KEY: &'static str = "clear_new_and_restocked_lock";

    /// Upper bound for both durations (ten years).
    pub const MAX_DURATION_SECS: u64 = 10 * 365 * 24 * 60 * 60;

    pub fn dwell(&self) -> chrono::Duration {
        chrono::Duration::seconds(Self::clamp_secs(self.dwell_secs))
    }

    pub fn lock_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.lock_ttl_secs.min(Self::MAX_DURATION_SECS))
    }

    fn clamp_secs(secs: u64) -> i64 {
        i64::try_from(secs.min(Self::MAX_DURATION_SECS)).unwrap_or(i64::MAX)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.term_label.trim().is_empty() {
            return Err(DomainError::validation("term_label cannot be empty"));
        }
        if self.taxonomy.trim().is_empty() {
            return Err(DomainError::validation("taxonomy cannot be empty"));
        }
        if self.dwell_secs == 0 || self.dwell_secs > Self::MAX_DURATION_SECS {
            return Err(DomainError::validation(format!(
                "dwell_secs must be in 1..={}",
                Self::MAX_DURATION_SECS
            )));
        }
        if self.lock_ttl_secs == 0 || self.lock_ttl_secs > Self::MAX_DURATION_SECS {
            return Err(DomainError::validation(format!(
                "lock_ttl_secs must be in 1..={}",
                Self::MAX_DURATION_SECS
            )));
        }
        if self.sweep_task.trim().is_empty() {
            return Err(DomainError::validation("sweep_task cannot be empty"));
        }
        if self.lock_key.trim().is_empty() {
            return Err(DomainError::validation("lock_key cannot be empty"));
        }
        Ok(())
    }

    /// Parse a JSON policy document; missing fields take their defaults.
    pub fn from_json(doc: &str) -> Result<Self, ClassifierError> {
        let policy: Self =
            serde_json::from_str(doc).map_err(|e| ClassifierError::PolicyDocument(e.to_string()))?;
        policy.validate()?;
        Ok(policy)
    }
}

impl Default for RestockPolicy {
    fn default() -> Self {
        Self {
            term_label: Self::DEFAULT_TERM_LABEL.to_string(),
            taxonomy: Self::DEFAULT_TAXONOMY.to_string(),
            dwell_secs: Self::DEFAULT_DWELL_SECS,
            lock_ttl_secs: Self::DEFAULT_LOCK_TTL_SECS,
            remove_on_depletion: true,
            sweep_lock: true,
            schedule_on: ScheduleOn::Activation,
            publish_trigger: PublishTrigger::Transition,
            sweep_task: Self::DEFAULT_SWEEP_TASK.to_string(),
            lock_key: Self::DEFAULT_LOCK_KEY.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_published_rule() {
        let policy = RestockPolicy::default();
        assert_eq!(policy.dwell(), chrono::Duration::days(5));
        assert_eq!(policy.lock_ttl(), std::time::Duration::from_secs(600));
        assert!(policy.remove_on_depletion);
        assert!(policy.sweep_lock);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn json_document_overrides_selected_fields() {
        let policy = RestockPolicy::from_json(
            r#"{"dwell_secs": 86400, "sweep_lock": false, "schedule_on": "startup"}"#,
        )
        .unwrap();
        assert_eq!(policy.dwell(), chrono::Duration::days(1));
        assert!(!policy.sweep_lock);
        assert_eq!(policy.schedule_on, ScheduleOn::Startup);
        assert_eq!(policy.term_label, "new-and-restocked");
    }

    #[test]
    fn rejects_zero_dwell_and_blank_label() {
        assert!(matches!(
            RestockPolicy::from_json(r#"{"dwell_secs": 0}"#),
            Err(ClassifierError::Policy(_))
        ));
        assert!(matches!(
            RestockPolicy::from_json(r#"{"term_label": "  "}"#),
            Err(ClassifierError::Policy(_))
        ));
        assert!(matches!(
            RestockPolicy::from_json("not json"),
            Err(ClassifierError::PolicyDocument(_))
        ));
    }

    #[test]
    fn parses_flags_case_insensitively() {
        assert_eq!("Startup".parse::<ScheduleOn>().unwrap(), ScheduleOn::Startup);
        assert_eq!("BOTH".parse::<PublishTrigger>().unwrap(), PublishTrigger::Both);
        assert!("weekly".parse::<ScheduleOn>().is_err());
        assert!(PublishTrigger::Both.on_transition() && PublishTrigger::Both.on_published());
        assert!(!PublishTrigger::Published.on_transition());
    }
}
