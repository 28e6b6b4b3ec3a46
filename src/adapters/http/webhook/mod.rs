//! Billing webhook endpoint.

mod handlers;
mod routes;

pub use handlers::{handle_billing_webhook, WebhookAppState};
pub use routes::webhook_router;
