//! Outbound URL validation.

mod guard;

pub use guard::{AllowList, EgressError, EgressGuard, ValidatedTarget};
