//! Failure-injecting store wrappers for failure-policy tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::domain::entitlement::EntitlementRecord;
use crate::domain::foundation::{Identity, Timestamp};
use crate::ports::{CounterStore, EntitlementRepository, StoreError};

use super::in_memory::InMemoryCounterStore;

/// Counter store that fails a configurable number of calls before
/// delegating to an in-memory store.
#[derive(Debug)]
pub struct FlakyCounterStore {
    inner: InMemoryCounterStore,
    failures_left: AtomicU32,
}

impl FlakyCounterStore {
    /// Fails every call.
    pub fn always_failing() -> Self {
        Self {
            inner: InMemoryCounterStore::new(),
            failures_left: AtomicU32::new(u32::MAX),
        }
    }

    /// Fails the first `n` calls, then behaves normally.
    pub fn failing_times(n: u32) -> Self {
        Self {
            inner: InMemoryCounterStore::new(),
            failures_left: AtomicU32::new(n),
        }
    }

    fn take_failure(&self) -> bool {
        match self.failures_left.load(Ordering::SeqCst) {
            0 => false,
            u32::MAX => true,
            _ => {
                self.failures_left.fetch_sub(1, Ordering::SeqCst);
                true
            }
        }
    }
}

#[async_trait]
impl CounterStore for FlakyCounterStore {
    async fn increment(&self, key: &str, expires_at: Timestamp) -> Result<u64, StoreError> {
        if self.take_failure() {
            return Err(StoreError::Unavailable("injected fault".to_string()));
        }
        self.inner.increment(key, expires_at).await
    }

    async fn get(&self, key: &str) -> Result<u64, StoreError> {
        if self.take_failure() {
            return Err(StoreError::Unavailable("injected fault".to_string()));
        }
        self.inner.get(key).await
    }
}

/// Entitlement repository that fails every call.
#[derive(Debug, Default)]
pub struct FlakyEntitlementRepository;

impl FlakyEntitlementRepository {
    pub fn always_failing() -> Self {
        Self
    }

    fn fault() -> StoreError {
        StoreError::Unavailable("injected fault".to_string())
    }
}

#[async_trait]
impl EntitlementRepository for FlakyEntitlementRepository {
    async fn find(&self, _identity: &Identity) -> Result<Option<EntitlementRecord>, StoreError> {
        Err(Self::fault())
    }

    async fn extend(
        &self,
        _identity: &Identity,
        _days: u32,
        _event_id: &str,
        _now: Timestamp,
    ) -> Result<EntitlementRecord, StoreError> {
        Err(Self::fault())
    }

    async fn revoke(
        &self,
        _identity: &Identity,
        _event_id: &str,
        _now: Timestamp,
    ) -> Result<(), StoreError> {
        Err(Self::fault())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn failing_times_recovers_after_n_faults() {
        let store = FlakyCounterStore::failing_times(2);
        let expires = Timestamp::now().plus_secs(60);

        assert!(store.increment("k", expires).await.is_err());
        assert!(store.increment("k", expires).await.is_err());
        assert_eq!(store.increment("k", expires).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn always_failing_never_recovers() {
        let store = FlakyCounterStore::always_failing();
        let expires = Timestamp::now().plus_secs(60);

        for _ in 0..5 {
            assert!(store.increment("k", expires).await.is_err());
        }
    }
}
