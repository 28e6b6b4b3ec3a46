//! Premium entitlement configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Entitlement configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EntitlementConfig {
    /// Days of premium access granted per completed payment
    #[serde(default = "default_grant_days")]
    pub premium_grant_days: u32,
}

impl EntitlementConfig {
    /// Validate entitlement configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.premium_grant_days == 0 {
            return Err(ValidationError::InvalidGrantDuration);
        }
        Ok(())
    }
}

impl Default for EntitlementConfig {
    fn default() -> Self {
        Self {
            premium_grant_days: default_grant_days(),
        }
    }
}

fn default_grant_days() -> u32 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_grant_is_thirty_days() {
        let config = EntitlementConfig::default();
        assert_eq!(config.premium_grant_days, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_duration_is_rejected() {
        let config = EntitlementConfig {
            premium_grant_days: 0,
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidGrantDuration)
        ));
    }
}
