//! Application layer - request-time orchestration over the domain services.

mod access;

pub use access::{AccessDecision, AccessPolicy, AccessRequest, DenyCode};
