//! Idempotent webhook processing.
//!
//! The processor turns at-least-once delivery into exactly-once entitlement
//! effects, keyed by event id:
//!
//! 1. Record the event as pending (conditional insert, first writer wins)
//! 2. Apply the entitlement mutation
//! 3. Mark the record applied
//!
//! A crash between steps leaves a pending record; the provider's redelivery
//! finds it, claims it with a compare-and-swap, re-applies, and marks it -
//! the event is never silently dropped. A concurrent duplicate that loses
//! the insert race (or the claim) is acknowledged without applying, because
//! the race winner owns the apply.

use std::sync::Arc;

use crate::domain::entitlement::EntitlementService;
use crate::domain::foundation::{Identity, Timestamp};
use crate::ports::{InsertOutcome, WebhookEventRecord, WebhookEventRepository};

use super::event::{BillingEvent, BillingEventType};
use super::errors::WebhookError;

/// A pending record younger than this is assumed to belong to an in-flight
/// attempt and is not re-applied. Provider redeliveries arrive well after
/// this window, so crashed attempts are still retried.
const PENDING_GRACE_SECS: u64 = 30;

/// Result of processing a verified billing event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The entitlement mutation was applied by this call.
    Applied,
    /// The event had already been applied (or is owned by a concurrent
    /// delivery); nothing was mutated.
    AlreadyApplied,
    /// Unknown event type: acknowledged so the provider stops retrying,
    /// but no mutation was produced.
    AcceptedNoop,
}

/// Applies verified billing events to the entitlement store exactly once.
pub struct IdempotentWebhookProcessor {
    events: Arc<dyn WebhookEventRepository>,
    entitlements: EntitlementService,
    grant_days: u32,
}

impl IdempotentWebhookProcessor {
    /// Creates a processor with the given dedup repository and entitlement
    /// service.
    pub fn new(
        events: Arc<dyn WebhookEventRepository>,
        entitlements: EntitlementService,
        grant_days: u32,
    ) -> Self {
        Self {
            events,
            entitlements,
            grant_days,
        }
    }

    /// Processes a verified event exactly once.
    ///
    /// The caller must have verified the payload signature already; this
    /// method never sees raw payloads.
    pub async fn process(&self, event: BillingEvent) -> Result<WebhookOutcome, WebhookError> {
        let now = Timestamp::now();

        match self.events.find(&event.id).await? {
            Some(record) if record.applied => {
                tracing::debug!(event_id = %event.id, "duplicate event, already applied");
                return Ok(WebhookOutcome::AlreadyApplied);
            }
            Some(record) => {
                // Recorded but not applied. A fresh record belongs to a
                // concurrent in-flight attempt; an old one marks a crash
                // between recording and marking, and must be retried.
                if record.received_at.plus_secs(PENDING_GRACE_SECS).is_after(&now) {
                    return Ok(WebhookOutcome::AlreadyApplied);
                }
                // The claim re-stamps the record, so of all instances that
                // read the same stale record exactly one re-applies.
                if !self.events.claim_pending(&record, now).await? {
                    return Ok(WebhookOutcome::AlreadyApplied);
                }
                tracing::info!(event_id = %event.id, "re-applying event recorded by a crashed attempt");
            }
            None => {
                let record = WebhookEventRecord::pending(&event.id, &event.event_type);
                match self.events.insert_pending(record).await? {
                    InsertOutcome::Inserted => {}
                    InsertOutcome::AlreadyExists => {
                        // Lost the insert race; the winner owns the apply.
                        return Ok(WebhookOutcome::AlreadyApplied);
                    }
                }
            }
        }

        let outcome = self.apply(&event, now).await?;
        self.events.mark_applied(&event.id).await?;
        Ok(outcome)
    }

    async fn apply(
        &self,
        event: &BillingEvent,
        now: Timestamp,
    ) -> Result<WebhookOutcome, WebhookError> {
        match event.parsed_type() {
            BillingEventType::PaymentCompleted => {
                let identity = self.event_identity(event)?;
                self.entitlements
                    .grant(&identity, self.grant_days, &event.id, now)
                    .await?;
                Ok(WebhookOutcome::Applied)
            }
            BillingEventType::PaymentRefunded => {
                let identity = self.event_identity(event)?;
                self.entitlements.revoke(&identity, &event.id, now).await?;
                Ok(WebhookOutcome::Applied)
            }
            BillingEventType::Unknown => {
                tracing::info!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    "unhandled billing event type, acknowledging without effect"
                );
                Ok(WebhookOutcome::AcceptedNoop)
            }
        }
    }

    fn event_identity(&self, event: &BillingEvent) -> Result<Identity, WebhookError> {
        Identity::from_account(&event.data.account_id)
            .map_err(|e| WebhookError::ParseError(format!("invalid account_id: {e}")))
    }
}
