//! End-to-end webhook behavior: signature verification through idempotent
//! entitlement application.

use std::sync::Arc;

use hmac::{Hmac, Mac};
use secrecy::SecretString;
use sha2::Sha256;

use tollgate::adapters::store::{InMemoryEntitlementRepository, InMemoryWebhookEventRepository};
use tollgate::domain::entitlement::EntitlementService;
use tollgate::domain::foundation::{Identity, Timestamp};
use tollgate::domain::webhook::{
    IdempotentWebhookProcessor, WebhookError, WebhookOutcome, WebhookVerifier,
};
use tollgate::ports::EntitlementRepository;

const SECRET: &str = "whsec_integration_secret";

fn sign(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

struct Engine {
    verifier: WebhookVerifier,
    processor: IdempotentWebhookProcessor,
    entitlements: Arc<InMemoryEntitlementRepository>,
}

fn engine() -> Engine {
    let entitlements = Arc::new(InMemoryEntitlementRepository::new());
    let processor = IdempotentWebhookProcessor::new(
        Arc::new(InMemoryWebhookEventRepository::new()),
        EntitlementService::new(entitlements.clone()),
        30,
    );
    Engine {
        verifier: WebhookVerifier::new(SecretString::new(SECRET.to_string())),
        processor,
        entitlements,
    }
}

fn payload(event_id: &str, event_type: &str, account: &str) -> String {
    format!(
        r#"{{"id":"{event_id}","type":"{event_type}","created":{},"data":{{"account_id":"{account}"}}}}"#,
        chrono::Utc::now().timestamp()
    )
}

async fn deliver(engine: &Engine, body: &str) -> Result<WebhookOutcome, WebhookError> {
    let header = sign(SECRET, chrono::Utc::now().timestamp(), body.as_bytes());
    let event = engine.verifier.verify_and_parse(body.as_bytes(), &header)?;
    engine.processor.process(event).await
}

#[tokio::test]
async fn replayed_delivery_grants_exactly_once() {
    let engine = engine();
    let body = payload("evt_1", "payment.completed", "u1");

    let first = deliver(&engine, &body).await.unwrap();
    let second = deliver(&engine, &body).await.unwrap();

    assert_eq!(first, WebhookOutcome::Applied);
    assert_eq!(second, WebhookOutcome::AlreadyApplied);

    let identity = Identity::from_account("u1").unwrap();
    let record = engine.entitlements.find(&identity).await.unwrap().unwrap();
    let now = Timestamp::now();
    assert!(record.is_active_at(now.plus_days(29)));
    // One grant of 30 days, not two.
    assert!(!record.is_active_at(now.plus_days(31)));
}

#[tokio::test]
async fn distinct_payments_stack_to_sixty_days() {
    let engine = engine();
    deliver(&engine, &payload("evt_a", "payment.completed", "u1"))
        .await
        .unwrap();
    deliver(&engine, &payload("evt_b", "payment.completed", "u1"))
        .await
        .unwrap();

    let identity = Identity::from_account("u1").unwrap();
    let record = engine.entitlements.find(&identity).await.unwrap().unwrap();
    let now = Timestamp::now();
    assert!(record.is_active_at(now.plus_days(59)));
    assert!(!record.is_active_at(now.plus_days(61)));
}

#[tokio::test]
async fn refund_after_payment_ends_access() {
    let engine = engine();
    deliver(&engine, &payload("evt_pay", "payment.completed", "u1"))
        .await
        .unwrap();
    deliver(&engine, &payload("evt_refund", "payment.refunded", "u1"))
        .await
        .unwrap();

    let identity = Identity::from_account("u1").unwrap();
    let record = engine.entitlements.find(&identity).await.unwrap().unwrap();
    assert!(!record.is_active_at(Timestamp::now()));
}

#[tokio::test]
async fn tampered_payload_is_rejected_without_mutation() {
    let engine = engine();
    let body = payload("evt_t", "payment.completed", "u1");
    let header = sign(SECRET, chrono::Utc::now().timestamp(), body.as_bytes());

    let tampered = body.replace("u1", "u2");
    let result = engine
        .verifier
        .verify_and_parse(tampered.as_bytes(), &header);
    assert!(matches!(result, Err(WebhookError::InvalidSignature)));

    for account in ["u1", "u2"] {
        let identity = Identity::from_account(account).unwrap();
        assert!(engine.entitlements.find(&identity).await.unwrap().is_none());
    }
}

#[tokio::test]
async fn stale_signature_is_rejected() {
    let engine = engine();
    let body = payload("evt_s", "payment.completed", "u1");
    let header = sign(SECRET, chrono::Utc::now().timestamp() - 600, body.as_bytes());

    let result = engine.verifier.verify_and_parse(body.as_bytes(), &header);
    assert!(matches!(result, Err(WebhookError::TimestampOutOfRange)));
}

#[tokio::test]
async fn unknown_event_type_is_acknowledged_without_mutation() {
    let engine = engine();
    let outcome = deliver(&engine, &payload("evt_u", "customer.updated", "u1"))
        .await
        .unwrap();
    assert_eq!(outcome, WebhookOutcome::AcceptedNoop);

    let identity = Identity::from_account("u1").unwrap();
    assert!(engine.entitlements.find(&identity).await.unwrap().is_none());
}

#[tokio::test]
async fn concurrent_deliveries_of_one_event_apply_once() {
    let engine = Arc::new(engine());
    let body = payload("evt_race", "payment.completed", "u1");

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let body = body.clone();
            tokio::spawn(async move { deliver(&engine, &body).await.unwrap() })
        })
        .collect();

    let mut applied = 0;
    for task in tasks {
        if task.await.unwrap() == WebhookOutcome::Applied {
            applied += 1;
        }
    }
    assert_eq!(applied, 1);

    let identity = Identity::from_account("u1").unwrap();
    let record = engine.entitlements.find(&identity).await.unwrap().unwrap();
    assert!(!record.is_active_at(Timestamp::now().plus_days(31)));
}
