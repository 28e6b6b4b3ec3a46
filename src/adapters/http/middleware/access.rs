//! Access middleware - runs the admit/deny decision ahead of the handler.
//!
//! The excluded API layer forwards the caller's identity hint in headers:
//! `X-Account-Id` for registered users, the source address (directly or via
//! `X-Forwarded-For` / `X-Real-IP`) for anonymous callers, and `X-Target-Url`
//! for URL-based requests. Denials are rendered here; admitted requests
//! reach the handler with an [`AdmittedContext`] extension attached.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::application::{AccessDecision, AccessPolicy, AccessRequest, DenyCode};
use crate::domain::foundation::Identity;
use crate::domain::quota::QuotaDecision;

use super::super::dto::{codes, DenialResponse};

/// Context attached to requests that passed the access decision.
#[derive(Debug, Clone)]
pub struct AdmittedContext {
    pub identity: Identity,
    pub premium: bool,
    /// Quota state after the consumed unit; `None` for premium callers.
    pub quota: Option<QuotaDecision>,
    /// Validated destination, present for URL-based requests.
    pub target_url: Option<url::Url>,
}

/// Admit-or-deny middleware over the access policy.
pub async fn access_middleware(
    State(policy): State<Arc<AccessPolicy>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let headers = request.headers();
    let access_request = AccessRequest {
        account_id: account_id(headers),
        caller_addr: client_addr(headers, connect_info.as_ref()),
        target_url: headers
            .get("X-Target-Url")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    };

    match policy.decide(access_request).await {
        AccessDecision::Admitted {
            identity,
            premium,
            quota,
            target,
        } => {
            let context = AdmittedContext {
                identity,
                premium,
                quota,
                target_url: target.map(|t| t.url),
            };

            let mut request = request;
            request.extensions_mut().insert(context.clone());

            let mut response = next.run(request).await;
            if let Some(quota) = &context.quota {
                add_quota_headers(&mut response, quota.remaining_daily, quota.remaining_monthly);
            }
            response
        }
        AccessDecision::Denied {
            code,
            message,
            retry_after_secs,
            remaining,
        } => denial_response(code, message, retry_after_secs, remaining),
    }
}

/// Handler for the guarded generation route.
///
/// The external generation call itself is out of scope; this returns the
/// admitted context the collaborator would be handed.
pub async fn admitted_probe(
    axum::Extension(context): axum::Extension<AdmittedContext>,
) -> impl IntoResponse {
    let (remaining_daily, remaining_monthly) = context
        .quota
        .map(|q| (Some(q.remaining_daily), Some(q.remaining_monthly)))
        .unwrap_or((None, None));

    Json(serde_json::json!({
        "code": codes::OK,
        "identity": context.identity.as_str(),
        "premium": context.premium,
        "remaining_daily": remaining_daily,
        "remaining_monthly": remaining_monthly,
        "target_url": context.target_url.as_ref().map(url::Url::as_str),
    }))
}

/// Account id from the `X-Account-Id` header, if present.
pub fn account_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get("X-Account-Id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Client address, checking forwarded headers before the socket address.
///
/// Order of precedence:
/// 1. `X-Forwarded-For` (first address in the list)
/// 2. `X-Real-IP`
/// 3. ConnectInfo socket address
pub fn client_addr(
    headers: &HeaderMap,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
) -> Option<IpAddr> {
    if let Some(forwarded) = headers.get("X-Forwarded-For").and_then(|h| h.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            if let Ok(addr) = first.trim().parse() {
                return Some(addr);
            }
        }
    }

    if let Some(real_ip) = headers.get("X-Real-IP").and_then(|h| h.to_str().ok()) {
        if let Ok(addr) = real_ip.trim().parse() {
            return Some(addr);
        }
    }

    connect_info.map(|ci| ci.0.ip())
}

fn denial_response(
    code: DenyCode,
    message: String,
    retry_after_secs: Option<u64>,
    remaining: Option<(u32, u32)>,
) -> Response {
    let (status, code_str) = match code {
        DenyCode::InvalidIdentity => (StatusCode::BAD_REQUEST, codes::INVALID_IDENTITY),
        DenyCode::QuotaExceeded => (StatusCode::TOO_MANY_REQUESTS, codes::QUOTA_EXCEEDED),
        DenyCode::UrlRejected => (StatusCode::FORBIDDEN, codes::URL_REJECTED),
        DenyCode::StoreUnavailable => {
            (StatusCode::SERVICE_UNAVAILABLE, codes::STORE_UNAVAILABLE)
        }
    };

    let mut body = DenialResponse::new(code_str, message);
    body.retry_after_secs = retry_after_secs;
    if let Some((daily, monthly)) = remaining {
        body.remaining_daily = Some(daily);
        body.remaining_monthly = Some(monthly);
    }

    let mut response = (status, Json(body)).into_response();
    if let Some(secs) = retry_after_secs {
        if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
            response.headers_mut().insert("Retry-After", value);
        }
    }
    if let Some((daily, monthly)) = remaining {
        add_quota_headers(&mut response, daily, monthly);
    }
    response
}

fn add_quota_headers(response: &mut Response, remaining_daily: u32, remaining_monthly: u32) {
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&remaining_daily.to_string()) {
        headers.insert("X-Quota-Remaining-Daily", value);
    }
    if let Ok(value) = HeaderValue::from_str(&remaining_monthly.to_string()) {
        headers.insert("X-Quota-Remaining-Monthly", value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwarded_header_wins_over_connect_info() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Forwarded-For", "203.0.113.7, 10.0.0.1".parse().unwrap());
        let socket: SocketAddr = "198.51.100.2:443".parse().unwrap();

        let addr = client_addr(&headers, Some(&ConnectInfo(socket)));
        assert_eq!(addr, Some("203.0.113.7".parse().unwrap()));
    }

    #[test]
    fn real_ip_is_second_choice() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Real-IP", "203.0.113.9".parse().unwrap());
        assert_eq!(client_addr(&headers, None), Some("203.0.113.9".parse().unwrap()));
    }

    #[test]
    fn falls_back_to_socket_address() {
        let socket: SocketAddr = "198.51.100.2:443".parse().unwrap();
        let addr = client_addr(&HeaderMap::new(), Some(&ConnectInfo(socket)));
        assert_eq!(addr, Some("198.51.100.2".parse().unwrap()));
    }

    #[test]
    fn garbage_forwarded_value_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Forwarded-For", "not-an-address".parse().unwrap());
        assert_eq!(client_addr(&headers, None), None);
    }

    #[test]
    fn quota_denial_carries_retry_after_header() {
        let response = denial_response(
            DenyCode::QuotaExceeded,
            "quota exhausted".to_string(),
            Some(3600),
            Some((0, 12)),
        );

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get("Retry-After").unwrap(), "3600");
        assert_eq!(
            response.headers().get("X-Quota-Remaining-Daily").unwrap(),
            "0"
        );
    }

    #[test]
    fn url_rejection_is_forbidden_without_quota_headers() {
        let response = denial_response(
            DenyCode::UrlRejected,
            "domain not allowed".to_string(),
            None,
            None,
        );
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().get("X-Quota-Remaining-Daily").is_none());
    }
}
