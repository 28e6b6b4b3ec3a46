//! Route definitions for the billing webhook.

use axum::routing::post;
use axum::Router;

use super::handlers::{handle_billing_webhook, WebhookAppState};

/// Builds the webhook router.
pub fn webhook_router(state: WebhookAppState) -> Router {
    Router::new()
        .route("/api/webhooks/billing", post(handle_billing_webhook))
        .with_state(state)
}
