//! Entitlement record and its extension math.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

/// Per-identity premium entitlement.
///
/// `active` is never stored: it is always derived from `expires_at` against
/// the current time, so expiry takes effect on the very next read with no
/// cleanup step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementRecord {
    /// When premium access ends.
    pub expires_at: Timestamp,

    /// Id of the billing event that last mutated this record.
    pub granted_by_event_id: String,
}

impl EntitlementRecord {
    /// True iff `expires_at` is still in the future at `now`.
    pub fn is_active_at(&self, now: Timestamp) -> bool {
        now.is_before(&self.expires_at)
    }

    /// Computes the record after a grant of `days`, extending rather than
    /// overwriting: `expires_at = max(current_expiry, now) + days`.
    ///
    /// A renewal during an active period therefore adds to the remaining
    /// time; it never discards earned time.
    pub fn extended(
        current: Option<&EntitlementRecord>,
        days: u32,
        event_id: &str,
        now: Timestamp,
    ) -> EntitlementRecord {
        let base = match current {
            Some(record) if record.expires_at.is_after(&now) => record.expires_at,
            _ => now,
        };
        EntitlementRecord {
            expires_at: base.plus_days(i64::from(days)),
            granted_by_event_id: event_id.to_string(),
        }
    }

    /// Computes the record after a revocation: expiry is set to `now`.
    pub fn revoked(event_id: &str, now: Timestamp) -> EntitlementRecord {
        EntitlementRecord {
            expires_at: now,
            granted_by_event_id: event_id.to_string(),
        }
    }
}
