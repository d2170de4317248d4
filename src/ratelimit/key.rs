//! Keys identifying one rate-limited resource.

use serde::{Deserialize, Serialize};

/// A key that identifies one rate-limited upstream resource.
///
/// Upstream APIs meter per credential, so a key is the API service plus
/// the account the calls are made with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LimiterKey {
    /// The upstream API service
    pub service: String,
    /// The account (credential login) calls are billed to
    pub account: String,
}

impl LimiterKey {
    /// Create a new limiter key.
    pub fn new(service: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            account: account.into(),
        }
    }
}

impl std::fmt::Display for LimiterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.service, self.account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_to_string() {
        let key = LimiterKey::new("serp", "agency@example.com");
        assert_eq!(key.to_string(), "serp:agency@example.com");
    }

    #[test]
    fn test_key_equality() {
        let key1 = LimiterKey::new("serp", "alice");
        let key2 = LimiterKey::new("serp".to_string(), "alice".to_string());
        let key3 = LimiterKey::new("keywords_data", "alice");

        assert_eq!(key1, key2);
        assert_ne!(key1, key3);
    }
}
