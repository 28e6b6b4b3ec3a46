//! Billing webhook configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Minimum acceptable length for the shared signing secret.
const MIN_SECRET_LEN: usize = 16;

/// Billing webhook configuration
///
/// The signing secret is held in a [`SecretString`] so it is never printed
/// by `Debug` output or logs. It is consumed only by the webhook verifier;
/// the request-serving path never sees it.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// Shared HMAC-SHA256 signing secret
    pub signing_secret: SecretString,

    /// How long processed event records are retained for dedup, in hours
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u64,
}

impl WebhookConfig {
    /// Event record retention as a Duration
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_hours * 3600)
    }

    /// Validate webhook configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.signing_secret.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("WEBHOOK_SIGNING_SECRET"));
        }
        if self.signing_secret.expose_secret().len() < MIN_SECRET_LEN {
            return Err(ValidationError::WebhookSecretTooShort);
        }
        if self.retention_hours == 0 {
            return Err(ValidationError::InvalidRetention);
        }
        Ok(())
    }
}

fn default_retention_hours() -> u64 {
    72
}
