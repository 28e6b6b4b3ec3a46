//! Quota Ledger - per-identity check-and-increment over the counter store.
//!
//! The ledger issues one atomic increment per window and decides admission
//! from the returned count (`count <= limit`). Under concurrent requests
//! from the same identity, exactly `limit` calls observe a count within the
//! limit; there is no read-then-write gap to lose updates in.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{FailurePolicy, QuotaConfig};
use crate::domain::foundation::{Identity, Timestamp};
use crate::ports::{CounterStore, StoreError};

use super::{QuotaWindow, WindowKind};

/// Store operations are retried this many times before the failure policy
/// applies.
const MAX_RETRIES: u32 = 2;

/// Base backoff between retries.
const RETRY_BACKOFF: Duration = Duration::from_millis(50);

/// Configured per-window limits.
#[derive(Debug, Clone, Copy)]
pub struct QuotaLimits {
    pub daily: u32,
    pub monthly: u32,
}

impl From<&QuotaConfig> for QuotaLimits {
    fn from(config: &QuotaConfig) -> Self {
        Self {
            daily: config.daily_limit,
            monthly: config.monthly_limit,
        }
    }
}

/// Outcome of a check-and-increment.
#[derive(Debug, Clone, Copy)]
pub struct QuotaDecision {
    /// Whether the request may proceed.
    pub admitted: bool,
    /// Admissions left in the current daily window.
    pub remaining_daily: u32,
    /// Admissions left in the current monthly window.
    pub remaining_monthly: u32,
    /// Seconds until the exhausted window rolls over (zero when admitted).
    pub retry_after_secs: u64,
}

/// Errors surfaced by the ledger.
///
/// Quota exhaustion is a decision, not an error; only infrastructure faults
/// appear here.
#[derive(Debug, Clone, thiserror::Error)]
pub enum QuotaError {
    #[error("quota store unavailable: {0}")]
    StoreUnavailable(String),
}

/// Tracks per-identity call counts in rolling daily and monthly windows.
///
/// Stateless apart from the store client; any number of engine instances
/// can run this concurrently against the same store.
pub struct QuotaLedger {
    store: Arc<dyn CounterStore>,
    limits: QuotaLimits,
    failure_policy: FailurePolicy,
}

impl QuotaLedger {
    /// Creates a ledger over the given counter store.
    pub fn new(store: Arc<dyn CounterStore>, limits: QuotaLimits, policy: FailurePolicy) -> Self {
        Self {
            store,
            limits,
            failure_policy: policy,
        }
    }

    /// Consumes one unit of quota for `identity` and reports the decision.
    ///
    /// Both the daily and the monthly window must be under limit for the
    /// request to be admitted. The consumed unit is not refunded on a later
    /// denial or client disconnect; consumption happens before the expensive
    /// external call by design.
    ///
    /// # Errors
    ///
    /// Returns `QuotaError::StoreUnavailable` only when the store stayed
    /// unreachable through the bounded retries and the failure policy is
    /// `Closed`. Under `Open` the request is admitted with a warning and
    /// unknown remaining counts.
    pub async fn check_and_increment(
        &self,
        identity: &Identity,
        now: Timestamp,
    ) -> Result<QuotaDecision, QuotaError> {
        let daily = QuotaWindow::containing(WindowKind::Daily, now);
        let monthly = QuotaWindow::containing(WindowKind::Monthly, now);

        let daily_count = match self.increment_with_retry(&daily, identity).await {
            Ok(count) => count,
            Err(err) => return self.apply_failure_policy(err),
        };
        let monthly_count = match self.increment_with_retry(&monthly, identity).await {
            Ok(count) => count,
            Err(err) => return self.apply_failure_policy(err),
        };

        let remaining_daily = remaining(self.limits.daily, daily_count);
        let remaining_monthly = remaining(self.limits.monthly, monthly_count);

        let daily_ok = daily_count <= u64::from(self.limits.daily);
        let monthly_ok = monthly_count <= u64::from(self.limits.monthly);

        if daily_ok && monthly_ok {
            return Ok(QuotaDecision {
                admitted: true,
                remaining_daily,
                remaining_monthly,
                retry_after_secs: 0,
            });
        }

        // The earliest rollover that frees capacity again.
        let retry_after_secs = if !daily_ok {
            now.secs_until(&daily.end())
        } else {
            now.secs_until(&monthly.end())
        };

        Ok(QuotaDecision {
            admitted: false,
            remaining_daily,
            remaining_monthly,
            retry_after_secs: retry_after_secs.max(1),
        })
    }

    /// Reads current counts without consuming quota.
    pub async fn status(
        &self,
        identity: &Identity,
        now: Timestamp,
    ) -> Result<(u32, u32), QuotaError> {
        let daily = QuotaWindow::containing(WindowKind::Daily, now);
        let monthly = QuotaWindow::containing(WindowKind::Monthly, now);

        let daily_count = self
            .store
            .get(&daily.counter_key(identity))
            .await
            .map_err(|e| QuotaError::StoreUnavailable(e.to_string()))?;
        let monthly_count = self
            .store
            .get(&monthly.counter_key(identity))
            .await
            .map_err(|e| QuotaError::StoreUnavailable(e.to_string()))?;

        Ok((
            remaining(self.limits.daily, daily_count),
            remaining(self.limits.monthly, monthly_count),
        ))
    }

    async fn increment_with_retry(
        &self,
        window: &QuotaWindow,
        identity: &Identity,
    ) -> Result<u64, StoreError> {
        let key = window.counter_key(identity);
        let expires_at = window.end();

        let mut attempt = 0;
        loop {
            match self.store.increment(&key, expires_at).await {
                Ok(count) => return Ok(count),
                Err(err) if attempt < MAX_RETRIES => {
                    attempt += 1;
                    tracing::debug!(
                        key = %key,
                        attempt,
                        error = %err,
                        "quota increment failed, retrying"
                    );
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn apply_failure_policy(&self, err: StoreError) -> Result<QuotaDecision, QuotaError> {
        match self.failure_policy {
            FailurePolicy::Closed => Err(QuotaError::StoreUnavailable(err.to_string())),
            FailurePolicy::Open => {
                tracing::warn!(
                    error = %err,
                    "quota store unavailable, admitting per fail-open policy"
                );
                // Remaining counts are unknown; report full limits rather
                // than fabricating a count.
                Ok(QuotaDecision {
                    admitted: true,
                    remaining_daily: self.limits.daily,
                    remaining_monthly: self.limits.monthly,
                    retry_after_secs: 0,
                })
            }
        }
    }
}

fn remaining(limit: u32, count: u64) -> u32 {
    u64::from(limit).saturating_sub(count).min(u64::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::store::{FlakyCounterStore, InMemoryCounterStore};

    fn ledger_with(
        store: Arc<dyn CounterStore>,
        daily: u32,
        monthly: u32,
        policy: FailurePolicy,
    ) -> QuotaLedger {
        QuotaLedger::new(
            store,
            QuotaLimits {
                daily,
                monthly,
            },
            policy,
        )
    }

    fn identity(name: &str) -> Identity {
        Identity::from_account(name).unwrap()
    }

    #[tokio::test]
    async fn admits_up_to_daily_limit_then_denies() {
        let ledger = ledger_with(
            Arc::new(InMemoryCounterStore::new()),
            5,
            20,
            FailurePolicy::Closed,
        );
        let id = identity("u1");
        let now = Timestamp::now();

        for i in 0..5 {
            let decision = ledger.check_and_increment(&id, now).await.unwrap();
            assert!(decision.admitted, "request {} should be admitted", i + 1);
            assert_eq!(decision.remaining_daily, 4 - i);
        }

        let denied = ledger.check_and_increment(&id, now).await.unwrap();
        assert!(!denied.admitted);
        assert_eq!(denied.remaining_daily, 0);
        assert!(denied.retry_after_secs >= 1);
    }

    #[tokio::test]
    async fn monthly_limit_denies_even_with_daily_headroom() {
        let ledger = ledger_with(
            Arc::new(InMemoryCounterStore::new()),
            5,
            3,
            FailurePolicy::Closed,
        );
        let id = identity("u2");
        let now = Timestamp::now();

        for _ in 0..3 {
            assert!(ledger.check_and_increment(&id, now).await.unwrap().admitted);
        }
        let denied = ledger.check_and_increment(&id, now).await.unwrap();
        assert!(!denied.admitted);
        assert_eq!(denied.remaining_monthly, 0);
    }

    #[tokio::test]
    async fn identities_are_independent_partitions() {
        let ledger = ledger_with(
            Arc::new(InMemoryCounterStore::new()),
            1,
            20,
            FailurePolicy::Closed,
        );
        let now = Timestamp::now();

        assert!(ledger
            .check_and_increment(&identity("a"), now)
            .await
            .unwrap()
            .admitted);
        assert!(!ledger
            .check_and_increment(&identity("a"), now)
            .await
            .unwrap()
            .admitted);
        // A different identity still has its full quota.
        assert!(ledger
            .check_and_increment(&identity("b"), now)
            .await
            .unwrap()
            .admitted);
    }

    #[tokio::test]
    async fn concurrent_requests_admit_exactly_the_limit() {
        let ledger = Arc::new(ledger_with(
            Arc::new(InMemoryCounterStore::new()),
            5,
            100,
            FailurePolicy::Closed,
        ));
        let id = identity("burst");
        let now = Timestamp::now();

        let tasks: Vec<_> = (0..20)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                let id = id.clone();
                tokio::spawn(async move { ledger.check_and_increment(&id, now).await.unwrap() })
            })
            .collect();

        let mut admitted = 0;
        for task in tasks {
            if task.await.unwrap().admitted {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 5);
    }

    #[tokio::test]
    async fn fail_closed_surfaces_store_fault() {
        let ledger = ledger_with(
            Arc::new(FlakyCounterStore::always_failing()),
            5,
            20,
            FailurePolicy::Closed,
        );
        let result = ledger
            .check_and_increment(&identity("u3"), Timestamp::now())
            .await;
        assert!(matches!(result, Err(QuotaError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn fail_open_admits_on_store_fault() {
        let ledger = ledger_with(
            Arc::new(FlakyCounterStore::always_failing()),
            5,
            20,
            FailurePolicy::Open,
        );
        let decision = ledger
            .check_and_increment(&identity("u4"), Timestamp::now())
            .await
            .unwrap();
        assert!(decision.admitted);
    }

    #[tokio::test]
    async fn transient_fault_is_retried() {
        // Fails twice, then recovers; within the retry budget.
        let store = Arc::new(FlakyCounterStore::failing_times(2));
        let ledger = ledger_with(store, 5, 20, FailurePolicy::Closed);

        let decision = ledger
            .check_and_increment(&identity("u5"), Timestamp::now())
            .await
            .unwrap();
        assert!(decision.admitted);
    }

    #[tokio::test]
    async fn status_does_not_consume_quota() {
        let ledger = ledger_with(
            Arc::new(InMemoryCounterStore::new()),
            5,
            20,
            FailurePolicy::Closed,
        );
        let id = identity("u6");
        let now = Timestamp::now();

        ledger.check_and_increment(&id, now).await.unwrap();
        let (daily, monthly) = ledger.status(&id, now).await.unwrap();
        assert_eq!(daily, 4);
        assert_eq!(monthly, 19);

        // Unchanged after reading status.
        let (daily_again, _) = ledger.status(&id, now).await.unwrap();
        assert_eq!(daily_again, 4);
    }
}
