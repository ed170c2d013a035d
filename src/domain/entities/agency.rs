//! Read model of the agency overseeing a convention.

use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Agency {
    pub id: Uuid,
    pub name: String,
    pub counsellor_emails: Vec<String>,
    pub validator_emails: Vec<String>,
}
