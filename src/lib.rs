//! Tollgate - Request Metering & Entitlement Engine
//!
//! Decides whether a request against a metered content-generation API may
//! proceed, and which destination it may fetch. Tracks per-caller quota in
//! rolling UTC windows, grants premium entitlement from signed billing
//! webhooks, and validates caller-supplied URLs before any fetch.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
