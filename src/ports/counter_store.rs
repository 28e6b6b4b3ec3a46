//! CounterStore port - atomic per-window counters in the shared store.

use async_trait::async_trait;

use crate::domain::foundation::Timestamp;

use super::StoreError;

/// Port for the shared quota counter store.
///
/// The single operation is an atomic read-modify-write: implementations must
/// never perform a separate read followed by a separate write, or concurrent
/// requests from the same identity could lose updates.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically increments the counter at `key`, creating it if absent.
    ///
    /// A counter created by this call expires at `expires_at` (the window
    /// end); expiry of an existing counter is left untouched so a counter
    /// created just before a boundary still expires at its own boundary.
    ///
    /// Returns the post-increment count.
    async fn increment(&self, key: &str, expires_at: Timestamp) -> Result<u64, StoreError>;

    /// Returns the current count at `key` without incrementing.
    ///
    /// Missing or expired counters read as zero.
    async fn get(&self, key: &str) -> Result<u64, StoreError>;
}
