//! Quota standing endpoint.

mod handlers;
mod routes;

pub use handlers::{get_quota_status, QuotaAppState};
pub use routes::quota_router;
