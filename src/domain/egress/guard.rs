//! Egress guard - validates destination URLs before any outbound fetch.
//!
//! Every rule is a hard reject: scheme, resolved addresses, allow-list. The
//! address check runs over the *resolved* addresses, not the hostname string,
//! so a DNS record pointing a listed domain at an internal address still
//! fails. Redirect hops are re-validated by the fetch adapter with the same
//! `validate` call.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

use thiserror::Error;
use url::Url;

use crate::ports::{DnsResolver, ResolveError};

/// Why a destination URL was rejected.
#[derive(Debug, Error)]
pub enum EgressError {
    /// The string is not a parseable absolute URL.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// Only http and https are fetchable.
    #[error("scheme '{0}' is not allowed")]
    SchemeNotAllowed(String),

    /// The URL carries no hostname (e.g. `http:///path`).
    #[error("url has no host")]
    MissingHost,

    /// The hostname is not on the operator allow-list.
    #[error("domain '{0}' is not on the allow-list")]
    DomainNotAllowed(String),

    /// The host is, or resolves to, an address in a forbidden range.
    #[error("address {0} is in a forbidden range")]
    ForbiddenAddress(IpAddr),

    /// DNS resolution failed or timed out.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Operator-configured set of fetchable domains.
///
/// Entries are matched case-insensitively; `*.example.com` matches any
/// subdomain of `example.com` but not `example.com` itself.
#[derive(Debug, Clone)]
pub struct AllowList {
    exact: Vec<String>,
    wildcard_suffixes: Vec<String>,
}

impl AllowList {
    pub fn new(domains: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        let mut exact = Vec::new();
        let mut wildcard_suffixes = Vec::new();
        for domain in domains {
            let domain = normalize_host(domain.as_ref());
            if domain.is_empty() {
                continue;
            }
            if let Some(suffix) = domain.strip_prefix("*.") {
                // Stored with a leading dot so "evilexample.com" cannot
                // match "*.example.com".
                wildcard_suffixes.push(format!(".{suffix}"));
            } else {
                exact.push(domain);
            }
        }
        Self {
            exact,
            wildcard_suffixes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.wildcard_suffixes.is_empty()
    }

    pub fn matches(&self, host: &str) -> bool {
        let host = normalize_host(host);
        self.exact.iter().any(|d| *d == host)
            || self
                .wildcard_suffixes
                .iter()
                .any(|suffix| host.ends_with(suffix.as_str()))
    }
}

fn normalize_host(host: &str) -> String {
    host.trim().trim_end_matches('.').to_ascii_lowercase()
}

/// A URL that passed every egress rule, with the addresses it resolved to.
///
/// The fetch adapter pins the connection to `addrs` so the request goes to
/// the addresses that were checked, not to a later re-resolution.
#[derive(Debug, Clone)]
pub struct ValidatedTarget {
    pub url: Url,
    pub addrs: Vec<IpAddr>,
}

/// Stateless validator for outbound destinations.
pub struct EgressGuard {
    resolver: Arc<dyn DnsResolver>,
    allow_list: AllowList,
}

impl EgressGuard {
    pub fn new(resolver: Arc<dyn DnsResolver>, allow_list: AllowList) -> Self {
        Self {
            resolver,
            allow_list,
        }
    }

    /// Validates a destination URL.
    ///
    /// Rules, in order, each a hard reject:
    /// 1. parseable absolute URL with an `http` or `https` scheme
    /// 2. hostname on the allow-list (literal IPs are never listed)
    /// 3. every resolved address outside the forbidden ranges
    ///
    /// Callers must re-validate on every redirect hop; a decision is only
    /// good for the exact URL it was made for.
    pub async fn validate(&self, raw_url: &str) -> Result<ValidatedTarget, EgressError> {
        let url = Url::parse(raw_url).map_err(|e| EgressError::InvalidUrl(e.to_string()))?;

        let scheme = url.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(EgressError::SchemeNotAllowed(scheme.to_string()));
        }

        let host = url.host().ok_or(EgressError::MissingHost)?;

        let addrs = match host {
            url::Host::Ipv4(ip) => {
                // Literal addresses never match a domain allow-list.
                return Err(self.reject_literal(IpAddr::V4(ip)));
            }
            url::Host::Ipv6(ip) => {
                return Err(self.reject_literal(IpAddr::V6(ip)));
            }
            url::Host::Domain(domain) => {
                if !self.allow_list.matches(domain) {
                    return Err(EgressError::DomainNotAllowed(domain.to_string()));
                }
                self.resolver.resolve(domain).await?
            }
        };

        for addr in &addrs {
            if is_forbidden_address(*addr) {
                tracing::warn!(url = %url, addr = %addr, "destination resolved to a forbidden address");
                return Err(EgressError::ForbiddenAddress(*addr));
            }
        }

        Ok(ValidatedTarget { url, addrs })
    }

    fn reject_literal(&self, addr: IpAddr) -> EgressError {
        if is_forbidden_address(addr) {
            EgressError::ForbiddenAddress(addr)
        } else {
            EgressError::DomainNotAllowed(addr.to_string())
        }
    }
}

/// Whether an address falls in a range the engine must never connect to.
///
/// Covers loopback, RFC 1918 private, link-local, carrier-grade NAT,
/// multicast, broadcast and unspecified for IPv4; loopback, unique-local,
/// link-local, multicast and unspecified for IPv6. IPv4-mapped IPv6
/// addresses are checked as their embedded IPv4 address.
pub fn is_forbidden_address(addr: IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => is_forbidden_v4(v4),
        IpAddr::V6(v6) => is_forbidden_v6(v6),
    }
}

fn is_forbidden_v4(addr: Ipv4Addr) -> bool {
    let octets = addr.octets();
    addr.is_loopback()
        || addr.is_private()
        || addr.is_link_local()
        || addr.is_multicast()
        || addr.is_broadcast()
        || addr.is_unspecified()
        || octets[0] == 0
        // 100.64.0.0/10 carrier-grade NAT
        || (octets[0] == 100 && (octets[1] & 0xc0) == 64)
        || addr.is_documentation()
}

fn is_forbidden_v6(addr: Ipv6Addr) -> bool {
    if let Some(v4) = addr.to_ipv4_mapped() {
        return is_forbidden_v4(v4);
    }
    let segments = addr.segments();
    addr.is_loopback()
        || addr.is_unspecified()
        || addr.is_multicast()
        // fc00::/7 unique-local
        || (segments[0] & 0xfe00) == 0xfc00
        // fe80::/10 link-local
        || (segments[0] & 0xffc0) == 0xfe80
}
