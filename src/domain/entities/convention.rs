//! Read model of a convention, limited to what recipient resolution needs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Kind of internship a convention covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InternshipKind {
    #[serde(rename = "immersion")]
    Immersion,
    #[serde(rename = "mini-stage-cci")]
    MiniStageCci,
}

impl InternshipKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InternshipKind::Immersion => "immersion",
            InternshipKind::MiniStageCci => "mini-stage-cci",
        }
    }
}

impl fmt::Display for InternshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InternshipKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "immersion" => Ok(InternshipKind::Immersion),
            "mini-stage-cci" => Ok(InternshipKind::MiniStageCci),
            other => Err(format!("unknown internship kind: {other}")),
        }
    }
}

/// A person taking part in a convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Parties that sign the convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signatories {
    pub beneficiary: Actor,
    pub establishment_representative: Actor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beneficiary_representative: Option<Actor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beneficiary_current_employer: Option<Actor>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Convention {
    pub id: Uuid,
    pub agency_id: Uuid,
    pub internship_kind: InternshipKind,
    pub signatories: Signatories,
}
