//! Egress guard configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Egress guard configuration
///
/// `allowed_domains` is a comma-separated list read from the environment,
/// e.g. `TOLLGATE__EGRESS__ALLOWED_DOMAINS=example.com,*.trusted.org`.
/// An entry is either an exact hostname or a `*.domain` wildcard matching
/// any subdomain.
#[derive(Debug, Clone, Deserialize)]
pub struct EgressConfig {
    /// Comma-separated destination allow-list
    pub allowed_domains: String,

    /// DNS resolution timeout in seconds
    #[serde(default = "default_resolve_timeout")]
    pub resolve_timeout_secs: u64,

    /// Maximum redirect hops followed during a guarded fetch
    #[serde(default = "default_max_redirects")]
    pub max_redirects: u32,
}

impl EgressConfig {
    /// Parsed allow-list entries, trimmed and lowercased.
    pub fn domains(&self) -> Vec<String> {
        self.allowed_domains
            .split(',')
            .map(|d| d.trim().to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .collect()
    }

    /// DNS resolution timeout as a Duration
    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs)
    }

    /// Validate egress configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let domains = self.domains();
        if domains.is_empty() {
            return Err(ValidationError::EmptyAllowList);
        }
        for entry in &domains {
            let host = entry.strip_prefix("*.").unwrap_or(entry);
            if host.is_empty() || host.contains('*') || host.contains('/') {
                return Err(ValidationError::InvalidAllowListEntry(entry.clone()));
            }
        }
        if self.resolve_timeout_secs == 0 {
            return Err(ValidationError::InvalidResolveTimeout);
        }
        Ok(())
    }
}

fn default_resolve_timeout() -> u64 {
    3
}

fn default_max_redirects() -> u32 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(list: &str) -> EgressConfig {
        EgressConfig {
            allowed_domains: list.to_string(),
            resolve_timeout_secs: default_resolve_timeout(),
            max_redirects: default_max_redirects(),
        }
    }

    #[test]
    fn parses_comma_separated_list() {
        let config = config("Example.com, *.trusted.org ,");
        assert_eq!(
            config.domains(),
            vec!["example.com".to_string(), "*.trusted.org".to_string()]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_empty_list() {
        assert!(matches!(
            config("  ,  ").validate(),
            Err(ValidationError::EmptyAllowList)
        ));
    }

    #[test]
    fn rejects_wildcard_in_middle() {
        assert!(matches!(
            config("foo.*.example.com").validate(),
            Err(ValidationError::InvalidAllowListEntry(_))
        ));
    }

    #[test]
    fn rejects_bare_wildcard() {
        assert!(config("*.").validate().is_err());
    }

    #[test]
    fn rejects_zero_timeout() {
        let mut c = config("example.com");
        c.resolve_timeout_secs = 0;
        assert!(matches!(
            c.validate(),
            Err(ValidationError::InvalidResolveTimeout)
        ));
    }
}
