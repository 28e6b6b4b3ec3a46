//! Route definitions for the quota endpoint.

use axum::routing::get;
use axum::Router;

use super::handlers::{get_quota_status, QuotaAppState};

/// Builds the quota router.
pub fn quota_router(state: QuotaAppState) -> Router {
    Router::new()
        .route("/api/quota", get(get_quota_status))
        .with_state(state)
}
