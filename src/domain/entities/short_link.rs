//! Short link entity mapping an opaque id to a long URL.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, unguessable identifier of a short link.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShortLinkId(String);

impl ShortLinkId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShortLinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ShortLinkId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A redeemable short link.
///
/// Short links are immutable once saved: the same id always resolves to the
/// same URL. Expiry is carried by the token inside the URL, not by the link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortLink {
    pub id: ShortLinkId,
    pub long_url: String,
    pub created_at: DateTime<Utc>,
}

impl ShortLink {
    pub fn new(id: ShortLinkId, long_url: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            long_url,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_link_creation() {
        let now = Utc::now();
        let link = ShortLink::new(
            ShortLinkId::from("abc123"),
            "https://example.com/verifier-et-signer?jwt=abc".to_string(),
            now,
        );

        assert_eq!(link.id.as_str(), "abc123");
        assert_eq!(link.long_url, "https://example.com/verifier-et-signer?jwt=abc");
        assert_eq!(link.created_at, now);
    }

    #[test]
    fn test_short_link_id_serializes_as_plain_string() {
        let id = ShortLinkId::new("xyz");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"xyz\"");
        assert_eq!(id.to_string(), "xyz");
    }
}
