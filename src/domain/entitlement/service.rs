//! Entitlement Store operations over the repository port.

use std::sync::Arc;

use crate::domain::foundation::{Identity, Timestamp};
use crate::ports::{EntitlementRepository, StoreError};

use super::EntitlementRecord;

/// Errors surfaced by entitlement mutations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EntitlementError {
    #[error("entitlement store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<StoreError> for EntitlementError {
    fn from(err: StoreError) -> Self {
        EntitlementError::StoreUnavailable(err.to_string())
    }
}

/// Tracks per-identity premium status and expiry.
///
/// Mutations only ever arrive from the verified webhook path; nothing on
/// the request-serving path can write an entitlement.
#[derive(Clone)]
pub struct EntitlementService {
    repository: Arc<dyn EntitlementRepository>,
}

impl EntitlementService {
    /// Creates a service over the given repository.
    pub fn new(repository: Arc<dyn EntitlementRepository>) -> Self {
        Self { repository }
    }

    /// Whether `identity` holds an active entitlement at `now`.
    ///
    /// Derived from `expires_at` on every call; the boolean itself is never
    /// cached. A store fault reads as not-premium (fail closed): an outage
    /// must never grant free premium access, only temporarily withhold paid
    /// benefits.
    pub async fn is_active(&self, identity: &Identity, now: Timestamp) -> bool {
        match self.repository.find(identity).await {
            Ok(Some(record)) => record.is_active_at(now),
            Ok(None) => false,
            Err(err) => {
                tracing::warn!(
                    identity = %identity,
                    error = %err,
                    "entitlement store unavailable, treating caller as not premium"
                );
                false
            }
        }
    }

    /// Grants `days` of premium access, extending any remaining time.
    pub async fn grant(
        &self,
        identity: &Identity,
        days: u32,
        event_id: &str,
        now: Timestamp,
    ) -> Result<EntitlementRecord, EntitlementError> {
        let record = self.repository.extend(identity, days, event_id, now).await?;
        tracing::info!(
            identity = %identity,
            event_id,
            expires_at = %record.expires_at.as_datetime(),
            "entitlement granted"
        );
        Ok(record)
    }

    /// Ends premium access immediately.
    pub async fn revoke(
        &self,
        identity: &Identity,
        event_id: &str,
        now: Timestamp,
    ) -> Result<(), EntitlementError> {
        self.repository.revoke(identity, event_id, now).await?;
        tracing::info!(identity = %identity, event_id, "entitlement revoked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::store::{FlakyEntitlementRepository, InMemoryEntitlementRepository};

    fn service() -> EntitlementService {
        EntitlementService::new(Arc::new(InMemoryEntitlementRepository::new()))
    }

    fn identity() -> Identity {
        Identity::from_account("u1").unwrap()
    }

    #[tokio::test]
    async fn unknown_identity_is_not_active() {
        let now = Timestamp::now();
        assert!(!service().is_active(&identity(), now).await);
    }

    #[tokio::test]
    async fn grant_activates_until_expiry() {
        let service = service();
        let id = identity();
        let now = Timestamp::from_unix_secs(1_000_000);

        service.grant(&id, 30, "evt1", now).await.unwrap();

        assert!(service.is_active(&id, now).await);
        assert!(service.is_active(&id, now.plus_days(29)).await);
        // Expired on the very next read, no cleanup required.
        assert!(!service.is_active(&id, now.plus_days(30)).await);
    }

    #[tokio::test]
    async fn renewal_extends_rather_than_resets() {
        let service = service();
        let id = identity();
        let now = Timestamp::from_unix_secs(1_000_000);

        service.grant(&id, 30, "evt1", now).await.unwrap();
        let renewed = service.grant(&id, 30, "evt2", now).await.unwrap();

        assert_eq!(renewed.expires_at, now.plus_days(60));
        assert!(service.is_active(&id, now.plus_days(59)).await);
    }

    #[tokio::test]
    async fn revoke_ends_access_immediately() {
        let service = service();
        let id = identity();
        let now = Timestamp::from_unix_secs(1_000_000);

        service.grant(&id, 30, "evt1", now).await.unwrap();
        assert!(service.is_active(&id, now).await);

        service.revoke(&id, "admin", now).await.unwrap();
        assert!(!service.is_active(&id, now).await);
    }

    #[tokio::test]
    async fn store_fault_reads_as_not_premium() {
        let service =
            EntitlementService::new(Arc::new(FlakyEntitlementRepository::always_failing()));
        assert!(!service.is_active(&identity(), Timestamp::now()).await);
    }

    #[tokio::test]
    async fn store_fault_fails_grant_loudly() {
        let service =
            EntitlementService::new(Arc::new(FlakyEntitlementRepository::always_failing()));
        let result = service
            .grant(&identity(), 30, "evt1", Timestamp::now())
            .await;
        assert!(matches!(result, Err(EntitlementError::StoreUnavailable(_))));
    }
}
