//! DNS resolver adapters.

use async_trait::async_trait;
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;

use crate::ports::{DnsResolver, ResolveError};

/// System resolver with a hard timeout.
///
/// A slow upstream resolver fails the lookup instead of stalling the
/// admit/deny decision.
#[derive(Debug, Clone)]
pub struct SystemDnsResolver {
    timeout: Duration,
}

impl SystemDnsResolver {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl DnsResolver for SystemDnsResolver {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, ResolveError> {
        let lookup = tokio::net::lookup_host((host, 0));

        let addrs = tokio::time::timeout(self.timeout, lookup)
            .await
            .map_err(|_| ResolveError::TimedOut {
                host: host.to_string(),
            })?
            .map_err(|e| ResolveError::Failed {
                host: host.to_string(),
                reason: e.to_string(),
            })?;

        let mut ips: Vec<IpAddr> = addrs.map(|sa| sa.ip()).collect();
        ips.dedup();

        if ips.is_empty() {
            return Err(ResolveError::NoAddresses {
                host: host.to_string(),
            });
        }
        Ok(ips)
    }
}

/// Fixed-answer resolver for tests.
#[derive(Debug, Clone, Default)]
pub struct StaticDnsResolver {
    records: HashMap<String, Vec<IpAddr>>,
}

impl StaticDnsResolver {
    pub fn new<H: Into<String>>(records: impl IntoIterator<Item = (H, Vec<IpAddr>)>) -> Self {
        Self {
            records: records
                .into_iter()
                .map(|(host, addrs)| (host.into().to_ascii_lowercase(), addrs))
                .collect(),
        }
    }

    /// Resolver with no records; every lookup fails.
    pub fn empty() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DnsResolver for StaticDnsResolver {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, ResolveError> {
        self.records
            .get(&host.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| ResolveError::NoAddresses {
                host: host.to_string(),
            })
    }
}
