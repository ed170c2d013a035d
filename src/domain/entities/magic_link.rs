//! Magic-link token claims, trust classification and front-end routes.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::domain::entities::Role;

/// Claims version written by current token issuers.
pub const CURRENT_CLAIMS_VERSION: u32 = 1;

/// Claims of a token issued by the current scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentClaims {
    pub application_id: String,
    pub role: Role,
    pub email_hash: String,
    pub version: u32,
    pub iat: i64,
    pub exp: i64,
}

/// Claims of a token issued before versioning: a role list and no email hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyClaims {
    pub application_id: String,
    pub roles: Vec<Role>,
    pub iat: i64,
    pub exp: i64,
}

/// Decoded magic-link claims in either supported shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MagicLinkClaims {
    Current(CurrentClaims),
    Legacy(LegacyClaims),
}

impl MagicLinkClaims {
    /// Decodes claims, using the presence of `version` as the discriminant.
    ///
    /// # Errors
    ///
    /// Fails when the payload matches neither shape, when a versioned payload
    /// has a version below 1, or when a legacy payload has no role.
    pub fn from_json(value: Value) -> Result<Self, String> {
        if value.get("version").is_some() {
            let claims: CurrentClaims =
                serde_json::from_value(value).map_err(|e| e.to_string())?;
            if claims.version < CURRENT_CLAIMS_VERSION {
                return Err(format!("unsupported claims version {}", claims.version));
            }
            Ok(MagicLinkClaims::Current(claims))
        } else {
            let claims: LegacyClaims = serde_json::from_value(value).map_err(|e| e.to_string())?;
            if claims.roles.is_empty() {
                return Err("legacy claims carry no role".to_string());
            }
            Ok(MagicLinkClaims::Legacy(claims))
        }
    }

    pub fn application_id(&self) -> &str {
        match self {
            MagicLinkClaims::Current(claims) => &claims.application_id,
            MagicLinkClaims::Legacy(claims) => &claims.application_id,
        }
    }

    /// The role the token is scoped to; legacy tokens use their first role.
    pub fn role(&self) -> Role {
        match self {
            MagicLinkClaims::Current(claims) => claims.role,
            // `from_json` rejects empty role lists; back office is never renewable anyway.
            MagicLinkClaims::Legacy(claims) => {
                claims.roles.first().copied().unwrap_or(Role::BackOffice)
            }
        }
    }

    /// The recipient email hash; absent on legacy tokens.
    pub fn email_hash(&self) -> Option<&str> {
        match self {
            MagicLinkClaims::Current(claims) => Some(&claims.email_hash),
            MagicLinkClaims::Legacy(_) => None,
        }
    }
}

/// Claims kept from a token only verifiable with the deprecated key.
///
/// The email hash is dropped: such a signature may come from a compromised key
/// and must not assert who the recipient is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialClaims {
    pub application_id: String,
    pub role: Role,
}

/// Outcome of checking a token against the current and deprecated keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenClassification {
    /// Signed with the current key (possibly expired).
    Trusted(MagicLinkClaims),
    /// Signed with the deprecated key only.
    PartiallyTrusted(PartialClaims),
    /// Signature verifiable with no known key.
    Untrusted,
    /// Not a decodable JWT, or claims matching no known shape.
    Malformed,
}

/// Front-end routes a magic link can point to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrontRoute {
    ConventionToSign,
    ManageConvention,
    ConventionImmersion,
    ImmersionAssessment,
    ConventionStatusDashboard,
}

/// Routes for which an expired link can be renewed, in matching order.
pub const RENEWABLE_ROUTES: [FrontRoute; 4] = [
    FrontRoute::ConventionToSign,
    FrontRoute::ManageConvention,
    FrontRoute::ConventionImmersion,
    FrontRoute::ImmersionAssessment,
];

impl FrontRoute {
    pub fn path(&self) -> &'static str {
        match self {
            FrontRoute::ConventionToSign => "verifier-et-signer",
            FrontRoute::ManageConvention => "pilotage-convention",
            FrontRoute::ConventionImmersion => "demande-immersion",
            FrontRoute::ImmersionAssessment => "bilan-immersion",
            FrontRoute::ConventionStatusDashboard => "statut-demande-immersion",
        }
    }
}

impl fmt::Display for FrontRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_versioned_payload_decodes_as_current() {
        let claims = MagicLinkClaims::from_json(json!({
            "applicationId": "c0ffee",
            "role": "validator",
            "emailHash": "abc",
            "version": 1,
            "iat": 1,
            "exp": 2
        }))
        .unwrap();

        assert!(matches!(claims, MagicLinkClaims::Current(_)));
        assert_eq!(claims.application_id(), "c0ffee");
        assert_eq!(claims.role(), Role::Validator);
        assert_eq!(claims.email_hash(), Some("abc"));
    }

    #[test]
    fn test_unversioned_payload_decodes_as_legacy() {
        let claims = MagicLinkClaims::from_json(json!({
            "applicationId": "c0ffee",
            "roles": ["establishment", "beneficiary"],
            "iat": 1,
            "exp": 2
        }))
        .unwrap();

        assert!(matches!(claims, MagicLinkClaims::Legacy(_)));
        assert_eq!(claims.role(), Role::EstablishmentRepresentative);
        assert_eq!(claims.email_hash(), None);
    }

    #[test]
    fn test_versioned_payload_without_hash_is_rejected() {
        let result = MagicLinkClaims::from_json(json!({
            "applicationId": "c0ffee",
            "roles": ["beneficiary"],
            "version": 1,
            "iat": 1,
            "exp": 2
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_version_zero_is_rejected() {
        let result = MagicLinkClaims::from_json(json!({
            "applicationId": "c0ffee",
            "role": "beneficiary",
            "emailHash": "abc",
            "version": 0,
            "iat": 1,
            "exp": 2
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_legacy_payload_without_roles_is_rejected() {
        let result = MagicLinkClaims::from_json(json!({
            "applicationId": "c0ffee",
            "roles": [],
            "iat": 1,
            "exp": 2
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_status_dashboard_is_not_renewable() {
        assert!(!RENEWABLE_ROUTES.contains(&FrontRoute::ConventionStatusDashboard));
        assert_eq!(FrontRoute::ConventionToSign.to_string(), "verifier-et-signer");
    }
}
