//! Magic-link token issuance and trust classification.

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};

use crate::domain::entities::{
    CURRENT_CLAIMS_VERSION, CurrentClaims, FrontRoute, MagicLinkClaims, PartialClaims, Role,
    TokenClassification,
};
use crate::error::AppError;
use crate::infrastructure::jwt::{JwtKeys, JwtVerifyError};

/// Lifetime of links to the convention status dashboard.
pub const STATUS_DASHBOARD_TTL_DAYS: i64 = 365;

/// Hashes a recipient email for embedding in token claims.
///
/// Returns a 64-character lowercase hex-encoded SHA-256 digest.
pub fn make_email_hash(email: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(email.as_bytes());
    hex::encode(hasher.finalize())
}

/// Input for issuing a magic-link token.
#[derive(Debug, Clone, Copy)]
pub struct IssueMagicLink<'a> {
    pub subject_id: &'a str,
    pub role: Role,
    pub email: &'a str,
    pub now: DateTime<Utc>,
    pub ttl: Duration,
}

/// Issues role-scoped, time-bounded tokens and decides how far an incoming
/// token can be trusted.
///
/// Tokens are signed with the current key. A deprecated key, kept after a
/// rotation, is only used to recognise older tokens; claims verified by it
/// never vouch for a recipient identity. There is no revocation list: a token
/// dies by expiry or by its key being dropped.
#[derive(Debug, Clone)]
pub struct MagicLinkAuthority {
    current: JwtKeys,
    deprecated: Option<JwtKeys>,
    base_url: String,
}

impl MagicLinkAuthority {
    pub fn new(current: JwtKeys, deprecated: Option<JwtKeys>, base_url: impl Into<String>) -> Self {
        Self {
            current,
            deprecated,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Signs a current-version token for `params.email`.
    ///
    /// Only the email hash is embedded, never the address itself.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if signing fails.
    pub fn issue(&self, params: IssueMagicLink<'_>) -> Result<String, AppError> {
        let claims = CurrentClaims {
            application_id: params.subject_id.to_string(),
            role: params.role,
            email_hash: make_email_hash(params.email),
            version: CURRENT_CLAIMS_VERSION,
            iat: params.now.timestamp(),
            exp: (params.now + params.ttl).timestamp(),
        };

        self.current.sign(&claims)
    }

    /// Builds `{base_url}/{route}?jwt={token}`.
    pub fn magic_link_url(&self, token: &str, route: FrontRoute) -> String {
        format!("{}/{}?jwt={}", self.base_url, route.path(), token)
    }

    /// Issues a token and wraps it in a front-end URL.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if signing fails.
    pub fn issue_link(
        &self,
        params: IssueMagicLink<'_>,
        route: FrontRoute,
    ) -> Result<String, AppError> {
        let token = self.issue(params)?;
        Ok(self.magic_link_url(&token, route))
    }

    /// Classifies a token by the strongest key that vouches for it.
    ///
    /// 1. current key, valid → trusted
    /// 2. current key, expired → signature re-checked without expiry → trusted
    /// 3. otherwise deprecated key (expiry ignored) → partially trusted
    /// 4. otherwise untrusted
    ///
    /// A token that is not a JWT at all, or whose verified claims match no
    /// known shape, is malformed.
    pub fn classify(&self, token: &str) -> TokenClassification {
        let verified = match self.current.verify(token) {
            Ok(claims) => Ok(claims),
            Err(JwtVerifyError::Expired) => self.current.verify_ignoring_expiry(token),
            Err(error) => Err(error),
        };

        match verified {
            Ok(raw) => match MagicLinkClaims::from_json(raw) {
                Ok(claims) => TokenClassification::Trusted(claims),
                Err(reason) => {
                    tracing::debug!(%reason, "Verified token carries unknown claims");
                    TokenClassification::Malformed
                }
            },
            Err(JwtVerifyError::Malformed) => TokenClassification::Malformed,
            Err(JwtVerifyError::Expired | JwtVerifyError::Invalid) => {
                self.classify_with_deprecated_key(token)
            }
        }
    }

    fn classify_with_deprecated_key(&self, token: &str) -> TokenClassification {
        let Some(deprecated) = &self.deprecated else {
            return TokenClassification::Untrusted;
        };

        match deprecated.verify_ignoring_expiry(token) {
            Ok(raw) => match MagicLinkClaims::from_json(raw) {
                Ok(claims) => {
                    tracing::warn!(
                        application_id = %claims.application_id(),
                        "Token verified with deprecated key only"
                    );
                    TokenClassification::PartiallyTrusted(PartialClaims {
                        application_id: claims.application_id().to_string(),
                        role: claims.role(),
                    })
                }
                Err(_) => TokenClassification::Malformed,
            },
            Err(JwtVerifyError::Malformed) => TokenClassification::Malformed,
            Err(JwtVerifyError::Expired | JwtVerifyError::Invalid) => {
                TokenClassification::Untrusted
            }
        }
    }
}
