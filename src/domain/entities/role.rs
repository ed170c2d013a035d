//! Roles a magic link can be scoped to.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role carried by a magic-link token.
///
/// Legacy tokens used `establishment` and `legal-representative`; those
/// spellings are still accepted when decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "beneficiary")]
    Beneficiary,
    #[serde(rename = "establishment-representative", alias = "establishment")]
    EstablishmentRepresentative,
    #[serde(rename = "establishment-tutor")]
    EstablishmentTutor,
    #[serde(
        rename = "beneficiary-representative",
        alias = "legal-representative"
    )]
    BeneficiaryRepresentative,
    #[serde(rename = "beneficiary-current-employer")]
    BeneficiaryCurrentEmployer,
    #[serde(rename = "counsellor")]
    Counsellor,
    #[serde(rename = "validator")]
    Validator,
    #[serde(rename = "backOffice")]
    BackOffice,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Beneficiary => "beneficiary",
            Role::EstablishmentRepresentative => "establishment-representative",
            Role::EstablishmentTutor => "establishment-tutor",
            Role::BeneficiaryRepresentative => "beneficiary-representative",
            Role::BeneficiaryCurrentEmployer => "beneficiary-current-employer",
            Role::Counsellor => "counsellor",
            Role::Validator => "validator",
            Role::BackOffice => "backOffice",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_wire_names_match_display() {
        for role in [
            Role::Beneficiary,
            Role::EstablishmentRepresentative,
            Role::EstablishmentTutor,
            Role::BeneficiaryRepresentative,
            Role::BeneficiaryCurrentEmployer,
            Role::Counsellor,
            Role::Validator,
            Role::BackOffice,
        ] {
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{}\"", role));
        }
    }

    #[test]
    fn test_legacy_aliases() {
        let role: Role = serde_json::from_str("\"establishment\"").unwrap();
        assert_eq!(role, Role::EstablishmentRepresentative);

        let role: Role = serde_json::from_str("\"legal-representative\"").unwrap();
        assert_eq!(role, Role::BeneficiaryRepresentative);
    }

    #[test]
    fn test_unknown_role_rejected() {
        assert!(serde_json::from_str::<Role>("\"admin\"").is_err());
    }
}
