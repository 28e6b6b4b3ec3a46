//! Handler for the read-only quota standing endpoint.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;

use crate::domain::entitlement::EntitlementService;
use crate::domain::foundation::{Identity, Timestamp};
use crate::domain::quota::QuotaLedger;

use super::super::dto::{codes, DenialResponse, QuotaStatusResponse};
use super::super::middleware::{account_id, client_addr};

/// Shared state for the quota routes.
#[derive(Clone)]
pub struct QuotaAppState {
    pub ledger: Arc<QuotaLedger>,
    pub entitlements: EntitlementService,
}

/// GET /api/quota - current standing without consuming quota.
pub async fn get_quota_status(
    State(state): State<QuotaAppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let identity = match account_id(&headers) {
        Some(account) => match Identity::from_account(&account) {
            Ok(identity) => identity,
            Err(err) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(DenialResponse::new(codes::INVALID_IDENTITY, err.to_string())),
                )
                    .into_response()
            }
        },
        None => match client_addr(&headers, connect_info.as_ref()) {
            Some(addr) => Identity::from_address(&addr),
            None => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(DenialResponse::new(
                        codes::INVALID_IDENTITY,
                        "request carries neither an account id nor a source address",
                    )),
                )
                    .into_response()
            }
        },
    };

    let now = Timestamp::now();
    let premium = state.entitlements.is_active(&identity, now).await;

    match state.ledger.status(&identity, now).await {
        Ok((remaining_daily, remaining_monthly)) => Json(QuotaStatusResponse {
            identity: identity.as_str().to_string(),
            premium,
            remaining_daily,
            remaining_monthly,
        })
        .into_response(),
        Err(err) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(DenialResponse::new(codes::STORE_UNAVAILABLE, err.to_string())),
        )
            .into_response(),
    }
}
