//! Adapters - infrastructure implementations of the ports.

pub mod dns;
pub mod fetch;
pub mod http;
pub mod store;
