//! In-memory store adapters for tests and single-process development.
//!
//! Not suitable for multi-instance deployments: state lives in this
//! process only.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::entitlement::EntitlementRecord;
use crate::domain::foundation::{Identity, Timestamp};
use crate::ports::{
    CounterStore, EntitlementRepository, InsertOutcome, StoreError, WebhookEventRecord,
    WebhookEventRepository,
};

#[derive(Debug, Clone)]
struct CounterState {
    count: u64,
    expires_at: Timestamp,
}

/// In-memory fixed-window counters with lazy expiry.
#[derive(Debug, Default)]
pub struct InMemoryCounterStore {
    counters: RwLock<HashMap<String, CounterState>>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn increment(&self, key: &str, expires_at: Timestamp) -> Result<u64, StoreError> {
        let now = Timestamp::now();
        let mut counters = self.counters.write().await;

        let state = counters
            .entry(key.to_string())
            .or_insert_with(|| CounterState {
                count: 0,
                expires_at,
            });

        // Lazy expiry stands in for the store's TTL.
        if !now.is_before(&state.expires_at) {
            state.count = 0;
            state.expires_at = expires_at;
        }

        state.count += 1;
        Ok(state.count)
    }

    async fn get(&self, key: &str) -> Result<u64, StoreError> {
        let now = Timestamp::now();
        let counters = self.counters.read().await;
        Ok(counters
            .get(key)
            .filter(|state| now.is_before(&state.expires_at))
            .map(|state| state.count)
            .unwrap_or(0))
    }
}

/// In-memory entitlement records.
#[derive(Debug, Default)]
pub struct InMemoryEntitlementRepository {
    records: RwLock<HashMap<String, EntitlementRecord>>,
}

impl InMemoryEntitlementRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntitlementRepository for InMemoryEntitlementRepository {
    async fn find(&self, identity: &Identity) -> Result<Option<EntitlementRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records.get(identity.as_str()).cloned())
    }

    async fn extend(
        &self,
        identity: &Identity,
        days: u32,
        event_id: &str,
        now: Timestamp,
    ) -> Result<EntitlementRecord, StoreError> {
        // The write lock makes read-extend-write atomic within this process.
        let mut records = self.records.write().await;
        let current = records.get(identity.as_str());
        let updated = EntitlementRecord::extended(current, days, event_id, now);
        records.insert(identity.as_str().to_string(), updated.clone());
        Ok(updated)
    }

    async fn revoke(
        &self,
        identity: &Identity,
        event_id: &str,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        records.insert(
            identity.as_str().to_string(),
            EntitlementRecord::revoked(event_id, now),
        );
        Ok(())
    }
}

/// In-memory webhook dedup records.
///
/// Retention is unbounded here; only the Redis adapter enforces the
/// retention TTL.
#[derive(Debug, Default)]
pub struct InMemoryWebhookEventRepository {
    records: RwLock<HashMap<String, WebhookEventRecord>>,
}

impl InMemoryWebhookEventRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WebhookEventRepository for InMemoryWebhookEventRepository {
    async fn find(&self, event_id: &str) -> Result<Option<WebhookEventRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records.get(event_id).cloned())
    }

    async fn insert_pending(
        &self,
        record: WebhookEventRecord,
    ) -> Result<InsertOutcome, StoreError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.event_id) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        records.insert(record.event_id.clone(), record);
        Ok(InsertOutcome::Inserted)
    }

    async fn claim_pending(
        &self,
        expected: &WebhookEventRecord,
        now: Timestamp,
    ) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        match records.get_mut(&expected.event_id) {
            Some(stored) if !stored.applied && *stored == *expected => {
                stored.received_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_applied(&self, event_id: &str) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        match records.get_mut(event_id) {
            Some(record) => {
                record.applied = true;
                Ok(())
            }
            None => Err(StoreError::Corrupt(format!(
                "mark_applied for unrecorded event '{event_id}'"
            ))),
        }
    }
}
