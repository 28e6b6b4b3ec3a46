//! Ports - trait seams between the domain and infrastructure.
//!
//! Adapters implement these traits against Redis, the system resolver, or
//! in-memory state for tests. The domain only ever sees the traits.

mod counter_store;
mod dns_resolver;
mod entitlement_repository;
mod webhook_event_repository;

pub use counter_store::CounterStore;
pub use dns_resolver::{DnsResolver, ResolveError};
pub use entitlement_repository::EntitlementRepository;
pub use webhook_event_repository::{
    InsertOutcome, WebhookEventRecord, WebhookEventRepository,
};

use thiserror::Error;

/// Errors surfaced by shared-store ports.
///
/// A store fault is always distinguishable from a normal decision: ports
/// never translate unavailability into a default value.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The shared store could not be reached or the operation failed.
    #[error("shared store unavailable: {0}")]
    Unavailable(String),

    /// The store returned data the engine could not interpret.
    #[error("corrupt store record: {0}")]
    Corrupt(String),
}
