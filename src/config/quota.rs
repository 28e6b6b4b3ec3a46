//! Quota limits and store failure policy

use serde::{Deserialize, Serialize};

use super::error::ValidationError;

/// Behavior when the shared store is unavailable during a quota check.
///
/// `Closed` denies the request (protects cost exposure, the default).
/// `Open` admits the request with a logged warning (availability-first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    Closed,
    Open,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        FailurePolicy::Closed
    }
}

/// Free-tier quota configuration
#[derive(Debug, Clone, Deserialize)]
pub struct QuotaConfig {
    /// Maximum admitted requests per UTC calendar day
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,

    /// Maximum admitted requests per UTC calendar month
    #[serde(default = "default_monthly_limit")]
    pub monthly_limit: u32,

    /// What to do when the counter store is unreachable
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

impl QuotaConfig {
    /// Validate quota configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.daily_limit == 0 || self.monthly_limit == 0 {
            return Err(ValidationError::InvalidQuotaLimit);
        }
        if self.daily_limit > self.monthly_limit {
            return Err(ValidationError::DailyExceedsMonthly);
        }
        Ok(())
    }
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            daily_limit: default_daily_limit(),
            monthly_limit: default_monthly_limit(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

fn default_daily_limit() -> u32 {
    5
}

fn default_monthly_limit() -> u32 {
    20
}
