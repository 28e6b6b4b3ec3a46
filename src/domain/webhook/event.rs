//! Billing event payloads.
//!
//! Only the fields the engine acts on are captured; anything else in the
//! provider's schema is ignored.

use serde::{Deserialize, Serialize};

/// A billing event delivered by the payment provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BillingEvent {
    /// Unique event identifier - the idempotency key.
    pub id: String,

    /// Event type string (e.g. "payment.completed").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Unix timestamp at which the provider created the event.
    pub created: i64,

    /// Event-specific data.
    pub data: BillingEventData,
}

/// Payload data for a billing event.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BillingEventData {
    /// The account the payment applies to.
    pub account_id: String,
}

/// Known event types.
///
/// Unknown types are accepted without effect so the provider does not
/// retry them indefinitely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingEventType {
    /// A completed payment - grants premium time.
    PaymentCompleted,
    /// A refunded payment - revokes premium access.
    PaymentRefunded,
    /// Anything the engine does not act on.
    Unknown,
}

impl BillingEventType {
    /// Parse the event type from the provider's string.
    pub fn from_str(s: &str) -> Self {
        match s {
            "payment.completed" => Self::PaymentCompleted,
            "payment.refunded" => Self::PaymentRefunded,
            _ => Self::Unknown,
        }
    }
}

impl BillingEvent {
    /// Parse the event type into a known variant.
    pub fn parsed_type(&self) -> BillingEventType {
        BillingEventType::from_str(&self.event_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_payment_completed() {
        let json = r#"{
            "id": "evt_1",
            "type": "payment.completed",
            "created": 1704067200,
            "data": {"account_id": "user-1"}
        }"#;
        let event: BillingEvent = serde_json::from_str(json).unwrap();

        assert_eq!(event.id, "evt_1");
        assert_eq!(event.parsed_type(), BillingEventType::PaymentCompleted);
        assert_eq!(event.data.account_id, "user-1");
    }

    #[test]
    fn unknown_type_maps_to_unknown() {
        assert_eq!(
            BillingEventType::from_str("customer.updated"),
            BillingEventType::Unknown
        );
    }

    #[test]
    fn extra_fields_are_ignored() {
        let json = r#"{
            "id": "evt_2",
            "type": "payment.refunded",
            "created": 1704067200,
            "livemode": true,
            "api_version": "2024-01-01",
            "data": {"account_id": "user-2", "amount": 999}
        }"#;
        let event: BillingEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.parsed_type(), BillingEventType::PaymentRefunded);
    }
}
