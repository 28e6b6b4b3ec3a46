//! Guarded outbound fetch.
//!
//! Wraps reqwest with the egress guard: automatic redirects are disabled
//! and every hop is re-validated, so a listed host redirecting to an
//! internal address aborts the fetch instead of following it. Connections
//! are pinned to the addresses the guard resolved and checked, closing the
//! re-resolution gap between validation and connect.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use reqwest::redirect::Policy;
use reqwest::Client;
use thiserror::Error;
use url::Url;

use crate::domain::egress::{EgressError, EgressGuard, ValidatedTarget};

/// Errors from a guarded fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// A hop failed egress validation.
    #[error(transparent)]
    Rejected(#[from] EgressError),

    /// The redirect chain exceeded the configured bound.
    #[error("too many redirects (limit {0})")]
    TooManyRedirects(u32),

    /// A redirect response carried no usable Location header.
    #[error("redirect without a valid location")]
    InvalidRedirect,

    /// The underlying HTTP request failed.
    #[error("request failed: {0}")]
    Http(String),
}

/// A completed fetch.
#[derive(Debug)]
pub struct FetchedContent {
    /// URL of the final hop actually fetched.
    pub final_url: Url,
    pub status: u16,
    pub body: bytes::Bytes,
}

/// Fetches validated URLs, re-validating every redirect hop.
pub struct GuardedFetcher {
    guard: Arc<EgressGuard>,
    timeout: Duration,
    max_redirects: u32,
}

impl GuardedFetcher {
    pub fn new(guard: Arc<EgressGuard>, timeout: Duration, max_redirects: u32) -> Self {
        Self {
            guard,
            timeout,
            max_redirects,
        }
    }

    /// Fetches `raw_url`, following at most `max_redirects` hops, each one
    /// validated by the egress guard before any connection is made.
    pub async fn fetch(&self, raw_url: &str) -> Result<FetchedContent, FetchError> {
        let mut current = raw_url.to_string();

        for _hop in 0..=self.max_redirects {
            let target = self.guard.validate(&current).await?;
            let response = self.request(&target).await?;

            if response.status().is_redirection() {
                current = next_location(target.url, &response)?;
                tracing::debug!(next = %current, "following validated redirect");
                continue;
            }

            let status = response.status().as_u16();
            let body = response
                .bytes()
                .await
                .map_err(|e| FetchError::Http(e.to_string()))?;
            return Ok(FetchedContent {
                final_url: target.url,
                status,
                body,
            });
        }

        Err(FetchError::TooManyRedirects(self.max_redirects))
    }

    async fn request(&self, target: &ValidatedTarget) -> Result<reqwest::Response, FetchError> {
        let host = target
            .url
            .host_str()
            .ok_or(FetchError::Rejected(EgressError::MissingHost))?;
        let port = target.url.port_or_known_default().unwrap_or(443);
        let pinned: Vec<SocketAddr> = target
            .addrs
            .iter()
            .map(|addr| SocketAddr::new(*addr, port))
            .collect();

        // One client per hop: pinning is per-hostname, and each hop may
        // name a different host.
        let client = Client::builder()
            .redirect(Policy::none())
            .resolve_to_addrs(host, &pinned)
            .timeout(self.timeout)
            .build()
            .map_err(|e| FetchError::Http(e.to_string()))?;

        client
            .get(target.url.clone())
            .send()
            .await
            .map_err(|e| FetchError::Http(e.to_string()))
    }
}

/// Resolves the Location header of a redirect against the hop it came from.
fn next_location(from: Url, response: &reqwest::Response) -> Result<String, FetchError> {
    let location = response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(FetchError::InvalidRedirect)?;

    let next = from.join(location).map_err(|_| FetchError::InvalidRedirect)?;
    Ok(next.to_string())
}
