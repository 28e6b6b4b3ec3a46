//! Shared-store adapters.
//!
//! The Redis adapters are the production implementations; the in-memory
//! adapters back tests and single-process development, and the flaky
//! wrappers simulate store outages for failure-policy tests.

mod flaky;
mod in_memory;
mod redis;

pub use flaky::{FlakyCounterStore, FlakyEntitlementRepository};
pub use in_memory::{
    InMemoryCounterStore, InMemoryEntitlementRepository, InMemoryWebhookEventRepository,
};
pub use redis::{RedisCounterStore, RedisEntitlementRepository, RedisWebhookEventRepository};
