//! Daily expiry sweep.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use restock_catalog::ItemFilter;
use restock_core::{ItemId, LeaseOwnerId, TermId};

use crate::classifier::RestockClassifier;
use crate::error::ClassifierError;
use crate::lease::{Acquire, LeaseGuard};

/// Result of one sweep invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SweepOutcome {
    /// Another sweep holds the lease; nothing was done.
    LockHeld { holder: Option<LeaseOwnerId> },
    TermUnresolved,
    Completed(SweepReport),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub scanned: usize,
    /// Items whose tag was retracted.
    pub expired: Vec<ItemId>,
    /// Tagged within the dwell period.
    pub fresh: usize,
    /// Tagged but without a timestamp; left alone.
    pub untimestamped: usize,
    /// Items where retraction failed.
    pub failed: Vec<ItemId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Expired,
    Fresh,
    Untimestamped,
}

impl RestockClassifier {
    /// Retract the classification from every published product tagged longer
    /// ago than the dwell period.
    pub fn sweep(&self) -> Result<SweepOutcome, ClassifierError> {
        let now = self.collab.clock.now();

        let guard = if self.policy.sweep_lock {
            match LeaseGuard::acquire(
                self.collab.transients.as_ref(),
                &self.policy.lock_key,
                self.policy.lock_ttl(),
                now,
            )? {
                Acquire::Acquired(guard) => Some(guard),
                Acquire::Held(holder) => {
                    let holder = holder.map(|lease| lease.owner);
                    info!(holder = ?holder, "sweep already running; skipped");
                    return Ok(SweepOutcome::LockHeld { holder });
                }
            }
        } else {
            None
        };

        let Some(term) = self.resolve_term() else {
            return Ok(SweepOutcome::TermUnresolved);
        };

        let report = self.expire_stale(term, now)?;

        if let Some(guard) = guard {
            if let Err(err) = guard.release() {
                warn!(error = %err, "failed to release sweep lease; it will expire");
            }
        }

        info!(
            scanned = report.scanned,
            expired = report.expired.len(),
            fresh = report.fresh,
            untimestamped = report.untimestamped,
            failed = report.failed.len(),
            "sweep completed"
        );
        Ok(SweepOutcome::Completed(report))
    }

    fn expire_stale(&self, term: TermId, now: DateTime<Utc>) -> Result<SweepReport, ClassifierError> {
        let candidates = self
            .collab
            .items
            .find(&ItemFilter::published_products_with(term))?;
        let dwell = self.policy.dwell();

        let mut report = SweepReport::default();
        for item in candidates {
            report.scanned += 1;
            match self.expire_if_stale(item, term, now, dwell) {
                Ok(Verdict::Expired) => report.expired.push(item),
                Ok(Verdict::Fresh) => report.fresh += 1,
                Ok(Verdict::Untimestamped) => report.untimestamped += 1,
                Err(err) => {
                    warn!(item = %item, error = %err, "failed to expire item; continuing");
                    report.failed.push(item);
                }
            }
        }
        Ok(report)
    }

    fn expire_if_stale(
        &self,
        item: ItemId,
        term: TermId,
        now: DateTime<Utc>,
        dwell: Duration,
    ) -> Result<Verdict, ClassifierError> {
        let Some(tagged_at) = self.meta(item).tagged_at()? else {
            return Ok(Verdict::Untimestamped);
        };
        if now - tagged_at <= dwell {
            return Ok(Verdict::Fresh);
        }
        self.untag(item, term)?;
        debug!(item = %item, tagged_at = %tagged_at, "classification expired");
        Ok(Verdict::Expired)
    }
}
