//! End-to-end quota behavior through the access policy.

use std::sync::Arc;

use tollgate::adapters::dns::StaticDnsResolver;
use tollgate::adapters::store::{InMemoryCounterStore, InMemoryEntitlementRepository};
use tollgate::application::{AccessDecision, AccessPolicy, AccessRequest, DenyCode};
use tollgate::config::FailurePolicy;
use tollgate::domain::egress::{AllowList, EgressGuard};
use tollgate::domain::entitlement::EntitlementService;
use tollgate::domain::foundation::{Identity, Timestamp};
use tollgate::domain::quota::{QuotaLedger, QuotaLimits};

fn policy(daily: u32, monthly: u32) -> (AccessPolicy, EntitlementService) {
    let entitlements = EntitlementService::new(Arc::new(InMemoryEntitlementRepository::new()));
    let ledger = Arc::new(QuotaLedger::new(
        Arc::new(InMemoryCounterStore::new()),
        QuotaLimits {
            daily,
            monthly,
        },
        FailurePolicy::Closed,
    ));
    let egress = Arc::new(EgressGuard::new(
        Arc::new(StaticDnsResolver::empty()),
        AllowList::new(["example.com"]),
    ));
    (
        AccessPolicy::new(entitlements.clone(), ledger, egress),
        entitlements,
    )
}

fn request(account: &str) -> AccessRequest {
    AccessRequest {
        account_id: Some(account.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn sixth_request_of_the_day_is_denied() {
    let (policy, _) = policy(5, 20);

    let mut admitted = Vec::new();
    for _ in 0..6 {
        admitted.push(policy.decide(request("u1")).await.is_admitted());
    }

    assert_eq!(admitted, vec![true, true, true, true, true, false]);
}

#[tokio::test]
async fn denial_reports_quota_metadata() {
    let (policy, _) = policy(1, 20);

    policy.decide(request("u1")).await;
    let denied = policy.decide(request("u1")).await;

    match denied {
        AccessDecision::Denied {
            code,
            retry_after_secs,
            remaining,
            ..
        } => {
            assert_eq!(code, DenyCode::QuotaExceeded);
            assert!(retry_after_secs.unwrap() >= 1);
            // The daily window rolls over within a day.
            assert!(retry_after_secs.unwrap() <= 86_400);
            assert_eq!(remaining.unwrap(), (0, 18));
        }
        other => panic!("expected a quota denial, got {other:?}"),
    }
}

#[tokio::test]
async fn concurrent_burst_admits_exactly_the_daily_limit() {
    let (policy, _) = policy(5, 100);
    let policy = Arc::new(policy);

    let tasks: Vec<_> = (0..40)
        .map(|_| {
            let policy = Arc::clone(&policy);
            tokio::spawn(async move { policy.decide(request("burst")).await.is_admitted() })
        })
        .collect();

    let mut admitted = 0;
    for task in tasks {
        if task.await.unwrap() {
            admitted += 1;
        }
    }
    assert_eq!(admitted, 5);
}

#[tokio::test]
async fn premium_exempts_quota_until_expiry() {
    let (policy, entitlements) = policy(2, 20);
    let identity = Identity::from_account("vip").unwrap();
    entitlements
        .grant(&identity, 30, "evt_pay", Timestamp::now())
        .await
        .unwrap();

    for _ in 0..10 {
        assert!(policy.decide(request("vip")).await.is_admitted());
    }

    // Revocation puts the identity back on the free tier; two more
    // requests fit the daily limit, the third does not.
    entitlements
        .revoke(&identity, "evt_refund", Timestamp::now())
        .await
        .unwrap();

    assert!(policy.decide(request("vip")).await.is_admitted());
    assert!(policy.decide(request("vip")).await.is_admitted());
    assert!(!policy.decide(request("vip")).await.is_admitted());
}

#[tokio::test]
async fn anonymous_and_account_quota_are_separate() {
    let (policy, _) = policy(1, 20);
    let addr = "203.0.113.7".parse().unwrap();

    let anon = AccessRequest {
        caller_addr: Some(addr),
        ..Default::default()
    };

    assert!(policy.decide(anon.clone()).await.is_admitted());
    assert!(!policy.decide(anon).await.is_admitted());

    // Logging in does not inherit the exhausted anonymous window.
    assert!(policy
        .decide(AccessRequest {
            account_id: Some("fresh-account".to_string()),
            caller_addr: Some(addr),
            ..Default::default()
        })
        .await
        .is_admitted());
}
