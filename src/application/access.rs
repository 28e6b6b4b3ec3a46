//! Access policy - the admit/deny decision for one inbound request.
//!
//! Each request walks the same states in order:
//! Identified -> EntitlementChecked -> QuotaChecked -> (UrlValidated) ->
//! Admitted | Denied. Premium identities skip QuotaChecked. A denial is
//! terminal; nothing here retries on behalf of the caller.

use std::net::IpAddr;
use std::sync::Arc;

use crate::domain::egress::{EgressGuard, ValidatedTarget};
use crate::domain::entitlement::EntitlementService;
use crate::domain::foundation::{Identity, Timestamp};
use crate::domain::quota::{QuotaDecision, QuotaError, QuotaLedger};

/// Identity hint and optional destination for one inbound request.
#[derive(Debug, Clone, Default)]
pub struct AccessRequest {
    /// Registered account id, if the caller is authenticated.
    pub account_id: Option<String>,
    /// Source address for anonymous callers.
    pub caller_addr: Option<IpAddr>,
    /// Destination URL for URL-based generation requests.
    pub target_url: Option<String>,
}

/// Machine-readable denial category.
///
/// Each category maps to a distinct response code; clients can tell a
/// quota denial from an egress rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyCode {
    /// No usable identity could be derived from the request.
    InvalidIdentity,
    /// Daily or monthly quota is exhausted.
    QuotaExceeded,
    /// The destination URL failed egress validation.
    UrlRejected,
    /// The shared store is down and the failure policy is closed.
    StoreUnavailable,
}

/// Terminal outcome of the access state machine.
#[derive(Debug)]
pub enum AccessDecision {
    Admitted {
        identity: Identity,
        /// Whether admission came from an active entitlement.
        premium: bool,
        /// Quota state after the consumed unit; `None` for premium callers.
        quota: Option<QuotaDecision>,
        /// Validated destination, present for URL-based requests.
        target: Option<ValidatedTarget>,
    },
    Denied {
        code: DenyCode,
        message: String,
        /// Seconds until a quota denial can succeed again.
        retry_after_secs: Option<u64>,
        /// `(remaining_daily, remaining_monthly)` for client display.
        remaining: Option<(u32, u32)>,
    },
}

impl AccessDecision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, AccessDecision::Admitted { .. })
    }

    fn denied(code: DenyCode, message: impl Into<String>) -> Self {
        AccessDecision::Denied {
            code,
            message: message.into(),
            retry_after_secs: None,
            remaining: None,
        }
    }
}

/// Orchestrates entitlement, quota, and egress checks for one request.
///
/// Holds no per-request state; one instance serves all requests.
pub struct AccessPolicy {
    entitlements: EntitlementService,
    ledger: Arc<QuotaLedger>,
    egress: Arc<EgressGuard>,
}

impl AccessPolicy {
    pub fn new(
        entitlements: EntitlementService,
        ledger: Arc<QuotaLedger>,
        egress: Arc<EgressGuard>,
    ) -> Self {
        Self {
            entitlements,
            ledger,
            egress,
        }
    }

    /// Runs the full admit/deny decision for one request.
    ///
    /// Quota is consumed before the expensive external call and is not
    /// refunded if the caller disconnects afterwards.
    pub async fn decide(&self, request: AccessRequest) -> AccessDecision {
        let now = Timestamp::now();

        // Identified
        let identity = match self.identify(&request) {
            Ok(identity) => identity,
            Err(message) => {
                tracing::debug!(%message, "request carried no usable identity");
                return AccessDecision::denied(DenyCode::InvalidIdentity, message);
            }
        };

        // EntitlementChecked: premium callers are exempt from quota.
        let premium = self.entitlements.is_active(&identity, now).await;

        // QuotaChecked
        let quota = if premium {
            None
        } else {
            match self.ledger.check_and_increment(&identity, now).await {
                Ok(decision) if decision.admitted => Some(decision),
                Ok(decision) => {
                    tracing::info!(
                        identity = %identity,
                        retry_after_secs = decision.retry_after_secs,
                        "quota exhausted"
                    );
                    return AccessDecision::Denied {
                        code: DenyCode::QuotaExceeded,
                        message: "quota exhausted for the current window".to_string(),
                        retry_after_secs: Some(decision.retry_after_secs),
                        remaining: Some((decision.remaining_daily, decision.remaining_monthly)),
                    };
                }
                Err(QuotaError::StoreUnavailable(reason)) => {
                    tracing::error!(identity = %identity, %reason, "quota store unavailable");
                    return AccessDecision::denied(
                        DenyCode::StoreUnavailable,
                        "service temporarily unavailable",
                    );
                }
            }
        };

        // UrlValidated, only for URL-based requests.
        let target = match &request.target_url {
            None => None,
            Some(url) => match self.egress.validate(url).await {
                Ok(target) => Some(target),
                Err(err) => {
                    tracing::info!(identity = %identity, error = %err, "destination rejected");
                    return AccessDecision::denied(DenyCode::UrlRejected, err.to_string());
                }
            },
        };

        // Admitted
        AccessDecision::Admitted {
            identity,
            premium,
            quota,
            target,
        }
    }

    fn identify(&self, request: &AccessRequest) -> Result<Identity, String> {
        if let Some(account_id) = &request.account_id {
            return Identity::from_account(account_id).map_err(|e| e.to_string());
        }
        if let Some(addr) = &request.caller_addr {
            return Ok(Identity::from_address(addr));
        }
        Err("request carries neither an account id nor a source address".to_string())
    }
}
