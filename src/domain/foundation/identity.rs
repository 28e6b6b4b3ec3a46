//! Caller identity - the partition key for all per-caller state.
//!
//! Registered users are keyed by their account id. Anonymous callers are
//! keyed by a one-way hash of their source address; the raw address is
//! never stored and never appears in a store key.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::net::IpAddr;

use super::ValidationError;

/// Maximum accepted length for an account identifier.
const MAX_ACCOUNT_ID_LEN: usize = 128;

/// Number of hex characters kept from the address hash.
const ADDRESS_HASH_LEN: usize = 32;

/// Stable key under which quota and entitlement state is tracked.
///
/// An identity derived from an account id and one derived from the same
/// caller's address are distinct partitions; anonymous usage does not
/// carry over after login.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Creates an identity from a registered account id.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the id is empty, too long, or contains
    /// characters outside `[A-Za-z0-9_.-]`.
    pub fn from_account(account_id: &str) -> Result<Self, ValidationError> {
        let trimmed = account_id.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::empty_field("account_id"));
        }
        if trimmed.len() > MAX_ACCOUNT_ID_LEN {
            return Err(ValidationError::invalid_format(
                "account_id",
                "exceeds maximum length",
            ));
        }
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        {
            return Err(ValidationError::invalid_format(
                "account_id",
                "contains characters outside [A-Za-z0-9_.-]",
            ));
        }
        Ok(Self(format!("acct:{trimmed}")))
    }

    /// Creates an identity from an anonymous caller's source address.
    ///
    /// The address is hashed with SHA-256; only a truncated hex digest is
    /// kept, so the identity cannot be reversed into the address.
    pub fn from_address(addr: &IpAddr) -> Self {
        let digest = Sha256::digest(addr.to_string().as_bytes());
        let hex = hex::encode(digest);
        Self(format!("anon:{}", &hex[..ADDRESS_HASH_LEN]))
    }

    /// Returns the identity as a string key.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if this identity belongs to a registered account.
    pub fn is_account(&self) -> bool {
        self.0.starts_with("acct:")
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
