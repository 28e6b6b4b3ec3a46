//! Domain layer - the engine's core decision logic.
//!
//! Everything in this module is deterministic given its inputs plus the
//! port traits it is handed. No HTTP, Redis, or DNS specifics live here.

pub mod egress;
pub mod entitlement;
pub mod foundation;
pub mod quota;
pub mod webhook;
