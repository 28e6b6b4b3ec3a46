//! Premium entitlement - a boolean-with-expiry privilege per identity.

mod record;
mod service;

pub use record::EntitlementRecord;
pub use service::{EntitlementError, EntitlementService};
