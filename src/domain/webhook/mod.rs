//! Billing webhook verification and idempotent processing.

mod errors;
mod event;
mod processor;
mod verifier;

pub use errors::WebhookError;
pub use event::{BillingEvent, BillingEventData, BillingEventType};
pub use processor::{IdempotentWebhookProcessor, WebhookOutcome};
pub use verifier::{SignatureHeader, WebhookVerifier};

#[cfg(test)]
pub use verifier::compute_test_signature;
