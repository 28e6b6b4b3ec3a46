//! Shared response DTOs and code strings for the HTTP surface.

use serde::{Deserialize, Serialize};

/// Machine-readable response codes surfaced to the API layer.
pub mod codes {
    pub const OK: &str = "OK";
    pub const INVALID_IDENTITY: &str = "INVALID_IDENTITY";
    pub const QUOTA_EXCEEDED: &str = "QUOTA_EXCEEDED";
    pub const URL_REJECTED: &str = "URL_REJECTED";
    pub const STORE_UNAVAILABLE: &str = "STORE_UNAVAILABLE";
    pub const WEBHOOK_INVALID_SIGNATURE: &str = "WEBHOOK_INVALID_SIGNATURE";
    pub const WEBHOOK_INVALID_PAYLOAD: &str = "WEBHOOK_INVALID_PAYLOAD";
    pub const WEBHOOK_ACCEPTED: &str = "WEBHOOK_ACCEPTED";
    pub const WEBHOOK_ACCEPTED_NOOP: &str = "WEBHOOK_ACCEPTED_NOOP";
}

/// Body of every denial response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenialResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_daily: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_monthly: Option<u32>,
}

impl DenialResponse {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            retry_after_secs: None,
            remaining_daily: None,
            remaining_monthly: None,
        }
    }
}

/// Body of a successful quota standing read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaStatusResponse {
    pub identity: String,
    pub premium: bool,
    pub remaining_daily: u32,
    pub remaining_monthly: u32,
}

/// Acknowledgement body for the webhook endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAck {
    pub code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denial_omits_absent_quota_fields() {
        let body = DenialResponse::new(codes::URL_REJECTED, "domain not allowed");
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("URL_REJECTED"));
        assert!(!json.contains("retry_after_secs"));
        assert!(!json.contains("remaining_daily"));
    }

    #[test]
    fn denial_serializes_quota_metadata() {
        let mut body = DenialResponse::new(codes::QUOTA_EXCEEDED, "quota exhausted");
        body.retry_after_secs = Some(3600);
        body.remaining_daily = Some(0);
        body.remaining_monthly = Some(12);

        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"retry_after_secs\":3600"));
        assert!(json.contains("\"remaining_monthly\":12"));
    }
}
