//! EntitlementRepository port - per-identity premium records in the shared store.

use async_trait::async_trait;

use crate::domain::entitlement::EntitlementRecord;
use crate::domain::foundation::{Identity, Timestamp};

use super::StoreError;

/// Port for per-identity entitlement records.
///
/// `extend` and `revoke` must be single round-trip atomic operations against
/// the shared store (conditional write or server-side script), so concurrent
/// grants for the same identity never lose an extension.
#[async_trait]
pub trait EntitlementRepository: Send + Sync {
    /// Returns the entitlement record for `identity`, if any.
    async fn find(&self, identity: &Identity) -> Result<Option<EntitlementRecord>, StoreError>;

    /// Atomically extends the entitlement:
    /// `expires_at = max(current_expiry, now) + days`.
    ///
    /// A renewal before expiry adds to the remaining time; it never resets
    /// earned time. Returns the record after the write.
    async fn extend(
        &self,
        identity: &Identity,
        days: u32,
        event_id: &str,
        now: Timestamp,
    ) -> Result<EntitlementRecord, StoreError>;

    /// Sets the entitlement expiry to `now`, ending premium access.
    async fn revoke(
        &self,
        identity: &Identity,
        event_id: &str,
        now: Timestamp,
    ) -> Result<(), StoreError>;
}
