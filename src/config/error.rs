//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid Redis URL format")]
    InvalidRedisUrl,

    #[error("Quota limit must be greater than zero")]
    InvalidQuotaLimit,

    #[error("Daily limit cannot exceed monthly limit")]
    DailyExceedsMonthly,

    #[error("Entitlement grant duration must be greater than zero")]
    InvalidGrantDuration,

    #[error("Webhook signing secret is too short")]
    WebhookSecretTooShort,

    #[error("Webhook retention must be greater than zero")]
    InvalidRetention,

    #[error("Egress allow-list cannot be empty")]
    EmptyAllowList,

    #[error("Invalid allow-list entry: {0}")]
    InvalidAllowListEntry(String),

    #[error("Invalid DNS resolution timeout")]
    InvalidResolveTimeout,
}
