//! Engine entry point: configuration, store connections, and the HTTP
//! server.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use tollgate::adapters::dns::SystemDnsResolver;
use tollgate::adapters::http::build_router;
use tollgate::adapters::store::{
    RedisCounterStore, RedisEntitlementRepository, RedisWebhookEventRepository,
};
use tollgate::application::AccessPolicy;
use tollgate::config::AppConfig;
use tollgate::domain::egress::{AllowList, EgressGuard};
use tollgate::domain::entitlement::EntitlementService;
use tollgate::domain::quota::{QuotaLedger, QuotaLimits};
use tollgate::domain::webhook::{IdempotentWebhookProcessor, WebhookVerifier};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let client = redis::Client::open(config.redis.url.as_str())?;
    let conn = tokio::time::timeout(
        config.redis.timeout(),
        client.get_multiplexed_tokio_connection(),
    )
    .await
    .map_err(|_| "timed out connecting to the shared store")??;
    tracing::info!("connected to shared store");

    let entitlements =
        EntitlementService::new(Arc::new(RedisEntitlementRepository::new(conn.clone())));
    let ledger = Arc::new(QuotaLedger::new(
        Arc::new(RedisCounterStore::new(conn.clone())),
        QuotaLimits::from(&config.quota),
        config.quota.failure_policy,
    ));
    let egress = Arc::new(EgressGuard::new(
        Arc::new(SystemDnsResolver::new(config.egress.resolve_timeout())),
        AllowList::new(config.egress.domains()),
    ));
    let policy = Arc::new(AccessPolicy::new(
        entitlements.clone(),
        ledger.clone(),
        egress,
    ));

    let verifier = Arc::new(WebhookVerifier::new(config.webhook.signing_secret.clone()));
    let processor = Arc::new(IdempotentWebhookProcessor::new(
        Arc::new(RedisWebhookEventRepository::new(
            conn,
            config.webhook.retention().as_secs(),
        )),
        entitlements.clone(),
        config.entitlement.premium_grant_days,
    ));

    let app = build_router(policy, ledger, entitlements, verifier, processor);

    let addr = config.server.socket_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "engine listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
