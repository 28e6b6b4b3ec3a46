//! Application configuration module
//!
//! Provides type-safe configuration loading from environment variables using
//! the `config` and `dotenvy` crates. Configuration is loaded with the
//! `TOLLGATE` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use tollgate::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Engine listening on {}", config.server.socket_addr());
//! ```

mod egress;
mod entitlement;
mod error;
mod quota;
mod redis;
mod server;
mod webhook;

pub use egress::EgressConfig;
pub use entitlement::EntitlementConfig;
pub use error::{ConfigError, ValidationError};
pub use quota::{FailurePolicy, QuotaConfig};
pub use redis::RedisConfig;
pub use server::ServerConfig;
pub use webhook::WebhookConfig;

use serde::Deserialize;

/// Root engine configuration.
///
/// Contains all configuration sections for the metering engine.
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port)
    #[serde(default)]
    pub server: ServerConfig,

    /// Shared store configuration (Redis connection)
    pub redis: RedisConfig,

    /// Quota limits and store failure policy
    #[serde(default)]
    pub quota: QuotaConfig,

    /// Premium entitlement configuration
    #[serde(default)]
    pub entitlement: EntitlementConfig,

    /// Billing webhook configuration (signing secret, retention)
    pub webhook: WebhookConfig,

    /// Egress guard configuration (allow-list, resolution timeout)
    pub egress: EgressConfig,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with the `TOLLGATE` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// # Environment Variable Format
    ///
    /// - `TOLLGATE__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `TOLLGATE__QUOTA__DAILY_LIMIT=5` -> `quota.daily_limit = 5`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("TOLLGATE")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.redis.validate()?;
        self.quota.validate()?;
        self.entitlement.validate()?;
        self.webhook.validate()?;
        self.egress.validate()?;
        Ok(())
    }
}
