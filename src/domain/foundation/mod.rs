//! Shared domain primitives: identity, timestamps, validation errors.

mod errors;
mod identity;
mod timestamp;

pub use errors::ValidationError;
pub use identity::Identity;
pub use timestamp::Timestamp;
