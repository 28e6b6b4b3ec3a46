//! Handler for inbound billing webhooks.
//!
//! Verification failures are answered with one generic 401 regardless of
//! which check failed: a caller probing the endpoint learns nothing about
//! the signature scheme or the timestamp bounds.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::domain::webhook::{
    IdempotentWebhookProcessor, WebhookError, WebhookOutcome, WebhookVerifier,
};

use super::super::dto::{codes, DenialResponse, WebhookAck};

/// Signature header set by the billing provider.
pub const SIGNATURE_HEADER: &str = "X-Billing-Signature";

/// Shared state for the webhook routes.
#[derive(Clone)]
pub struct WebhookAppState {
    pub verifier: Arc<WebhookVerifier>,
    pub processor: Arc<IdempotentWebhookProcessor>,
}

/// POST /api/webhooks/billing - verify and apply a billing event.
pub async fn handle_billing_webhook(
    State(state): State<WebhookAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = match headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()) {
        Some(signature) => signature,
        None => return invalid_signature(),
    };

    let event = match state.verifier.verify_and_parse(&body, signature) {
        Ok(event) => event,
        Err(err) => return verification_failure(err),
    };

    match state.processor.process(event).await {
        Ok(WebhookOutcome::Applied) | Ok(WebhookOutcome::AlreadyApplied) => (
            StatusCode::OK,
            Json(WebhookAck {
                code: codes::WEBHOOK_ACCEPTED.to_string(),
            }),
        )
            .into_response(),
        Ok(WebhookOutcome::AcceptedNoop) => (
            StatusCode::OK,
            Json(WebhookAck {
                code: codes::WEBHOOK_ACCEPTED_NOOP.to_string(),
            }),
        )
            .into_response(),
        Err(err) => processing_failure(err),
    }
}

fn verification_failure(err: WebhookError) -> Response {
    match err {
        WebhookError::InvalidSignature
        | WebhookError::TimestampOutOfRange
        | WebhookError::InvalidTimestamp => {
            tracing::warn!(error = %err, "webhook rejected");
            invalid_signature()
        }
        WebhookError::ParseError(_) => (
            StatusCode::BAD_REQUEST,
            Json(DenialResponse::new(
                codes::WEBHOOK_INVALID_PAYLOAD,
                "malformed webhook payload",
            )),
        )
            .into_response(),
        WebhookError::Store(reason) => store_failure(reason),
    }
}

fn processing_failure(err: WebhookError) -> Response {
    match err {
        // A 5xx makes the provider redeliver; the idempotency record
        // guarantees the retry applies at most once.
        WebhookError::Store(reason) => store_failure(reason),
        other => (
            StatusCode::BAD_REQUEST,
            Json(DenialResponse::new(
                codes::WEBHOOK_INVALID_PAYLOAD,
                other.to_string(),
            )),
        )
            .into_response(),
    }
}

fn invalid_signature() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(DenialResponse::new(
            codes::WEBHOOK_INVALID_SIGNATURE,
            "webhook signature verification failed",
        )),
    )
        .into_response()
}

fn store_failure(reason: String) -> Response {
    tracing::error!(%reason, "webhook store unavailable");
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(DenialResponse::new(
            codes::STORE_UNAVAILABLE,
            "service temporarily unavailable",
        )),
    )
        .into_response()
}
