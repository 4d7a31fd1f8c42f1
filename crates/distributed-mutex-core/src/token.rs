//! Ownership tokens.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Proof of ownership for one acquisition of a lock key.
///
/// A fresh token is minted for every non-reentrant acquire; the store only
/// lets the holder of the currently stored token release or extend the record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnershipToken(String);

impl OwnershipToken {
    /// Wraps an externally supplied token value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Mints a new random token.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the token, returning the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for OwnershipToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for OwnershipToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for OwnershipToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for OwnershipToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_tokens_are_unique() {
        let a = OwnershipToken::generate();
        let b = OwnershipToken::generate();
        assert_ne!(a, b);
        assert!(!a.as_str().is_empty());
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let token = OwnershipToken::new("abc");
        assert_eq!(serde_json::to_string(&token).unwrap(), "\"abc\"");
    }
}
