//! WebhookEventRepository port - dedup records for billing events.
//!
//! Billing providers deliver at-least-once: the same event can arrive
//! multiple times, concurrently, and out of order. This port gives the
//! processor the primitives it needs for exactly-once effects: a
//! conditional first-writer-wins insert, a compare-and-swap claim for
//! re-applying crashed attempts, and an applied marker.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

use super::StoreError;

/// Dedup record for a single billing event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEventRecord {
    /// Provider event id - the idempotency key.
    pub event_id: String,

    /// Provider event type string (e.g. "payment.completed").
    pub event_type: String,

    /// When the engine first recorded the event.
    pub received_at: Timestamp,

    /// True once the entitlement mutation has been applied.
    ///
    /// A record with `applied == false` marks an attempt that recorded the
    /// event but crashed before applying; redelivery retries it.
    pub applied: bool,
}

impl WebhookEventRecord {
    /// Creates a pending (not yet applied) record.
    pub fn pending(event_id: impl Into<String>, event_type: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            received_at: Timestamp::now(),
            applied: false,
        }
    }
}

/// Result of attempting to insert a pending record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// First time seeing this event; the caller owns applying it.
    Inserted,
    /// Another delivery already recorded this event.
    AlreadyExists,
}

/// Port for storing billing-event dedup records.
///
/// Records are retained for a bounded window (store TTL) purely for dedup;
/// the engine never deletes them explicitly.
#[async_trait]
pub trait WebhookEventRepository: Send + Sync {
    /// Finds a previously recorded event by its provider id.
    async fn find(&self, event_id: &str) -> Result<Option<WebhookEventRecord>, StoreError>;

    /// Conditionally inserts a pending record; first writer wins.
    ///
    /// Implementations must make the existence check and the write a single
    /// atomic operation (e.g. `SET NX`), never check-then-set.
    async fn insert_pending(&self, record: WebhookEventRecord) -> Result<InsertOutcome, StoreError>;

    /// Claims a pending record for re-application after a crashed attempt.
    ///
    /// Succeeds only if the stored record still equals `expected` exactly as
    /// the caller read it; on success `received_at` is re-stamped to `now`.
    /// The re-stamp is what serializes recovery across engine instances:
    /// every concurrent claimant read the same stale record, the first swap
    /// changes it, and all later swaps fail the comparison. Check and write
    /// must be a single atomic operation.
    async fn claim_pending(
        &self,
        expected: &WebhookEventRecord,
        now: Timestamp,
    ) -> Result<bool, StoreError>;

    /// Marks a recorded event as applied.
    async fn mark_applied(&self, event_id: &str) -> Result<(), StoreError>;
}
