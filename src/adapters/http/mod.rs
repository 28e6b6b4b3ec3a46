//! HTTP adapters - the engine's inbound surface.
//!
//! The access middleware guards the generation route; the quota router
//! reports standing without consuming it; the webhook router receives
//! billing events. All are mounted by `build_router`.

pub mod dto;
pub mod middleware;
pub mod quota;
pub mod webhook;

use std::sync::Arc;
use std::time::Duration;

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::application::AccessPolicy;
use crate::domain::entitlement::EntitlementService;
use crate::domain::quota::QuotaLedger;
use crate::domain::webhook::{IdempotentWebhookProcessor, WebhookVerifier};

use middleware::access_middleware;
use quota::QuotaAppState;
use webhook::WebhookAppState;

/// Builds the full application router.
pub fn build_router(
    policy: Arc<AccessPolicy>,
    ledger: Arc<QuotaLedger>,
    entitlements: EntitlementService,
    verifier: Arc<WebhookVerifier>,
    processor: Arc<IdempotentWebhookProcessor>,
) -> Router {
    // Every request through this router consumes quota on admission.
    let guarded = Router::new()
        .route("/api/generate", post(middleware::admitted_probe))
        .layer(from_fn_with_state(policy, access_middleware));

    // Read-only standing; deliberately outside the consuming middleware.
    let quota = quota::quota_router(QuotaAppState {
        ledger,
        entitlements,
    });

    let webhooks = webhook::webhook_router(WebhookAppState {
        verifier,
        processor,
    });

    Router::new()
        .merge(guarded)
        .merge(quota)
        .merge(webhooks)
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
}

async fn health() -> &'static str {
    "ok"
}
