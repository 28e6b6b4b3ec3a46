//! Webhook error types.

use thiserror::Error;

use crate::domain::entitlement::EntitlementError;
use crate::ports::StoreError;

/// Errors that can occur while verifying or processing a billing webhook.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Signature verification failed. Responded to generically: the caller
    /// never learns which part of the check failed.
    #[error("invalid webhook signature")]
    InvalidSignature,

    /// Event timestamp is older than the acceptance window.
    #[error("webhook timestamp out of range")]
    TimestampOutOfRange,

    /// Event timestamp is too far in the future.
    #[error("invalid webhook timestamp")]
    InvalidTimestamp,

    /// Signature header or payload could not be parsed.
    #[error("webhook parse error: {0}")]
    ParseError(String),

    /// The dedup or entitlement store failed.
    #[error("webhook store error: {0}")]
    Store(String),
}

impl From<StoreError> for WebhookError {
    fn from(err: StoreError) -> Self {
        WebhookError::Store(err.to_string())
    }
}

impl From<EntitlementError> for WebhookError {
    fn from(err: EntitlementError) -> Self {
        WebhookError::Store(err.to_string())
    }
}
