//! DnsResolver port - bounded hostname resolution for the egress guard.

use async_trait::async_trait;
use std::net::IpAddr;
use thiserror::Error;

/// Port for DNS resolution.
///
/// Implementations must bound resolution time; a slow resolver must never
/// stall the admit/deny decision indefinitely.
#[async_trait]
pub trait DnsResolver: Send + Sync {
    /// Resolves a hostname to its addresses.
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, ResolveError>;
}

/// Errors that can occur during DNS resolution.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    /// Resolution failed outright.
    #[error("resolution failed for '{host}': {reason}")]
    Failed { host: String, reason: String },

    /// Resolution exceeded the configured timeout.
    #[error("resolution timed out for '{host}'")]
    TimedOut { host: String },

    /// The hostname resolved to no addresses.
    #[error("no addresses for '{host}'")]
    NoAddresses { host: String },
}
