//! PostgreSQL read adapters for conventions and agencies.

use async_trait::async_trait;
use serde_json::json;
use sqlx::types::Json;
use uuid::Uuid;

use super::SharedTransaction;
use crate::domain::entities::{Agency, Convention, InternshipKind, Signatories};
use crate::domain::repositories::{AgencyRepository, ConventionRepository};
use crate::error::AppError;

#[derive(sqlx::FromRow)]
struct ConventionRow {
    id: Uuid,
    agency_id: Uuid,
    internship_kind: String,
    signatories: Json<Signatories>,
}

impl TryFrom<ConventionRow> for Convention {
    type Error = AppError;

    fn try_from(row: ConventionRow) -> Result<Self, Self::Error> {
        let internship_kind: InternshipKind = row.internship_kind.parse().map_err(|reason| {
            AppError::internal(
                "Unknown internship kind",
                json!({ "convention_id": row.id, "reason": reason }),
            )
        })?;

        Ok(Convention {
            id: row.id,
            agency_id: row.agency_id,
            internship_kind,
            signatories: row.signatories.0,
        })
    }
}

pub struct PgConventionRepository {
    tx: SharedTransaction,
}

impl PgConventionRepository {
    pub fn new(tx: SharedTransaction) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl ConventionRepository for PgConventionRepository {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Convention>, AppError> {
        let mut tx = self.tx.lock().await?;
        let row = sqlx::query_as::<_, ConventionRow>(
            r#"
            SELECT id, agency_id, internship_kind, signatories
            FROM conventions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

        row.map(Convention::try_from).transpose()
    }
}

#[derive(sqlx::FromRow)]
struct AgencyRow {
    id: Uuid,
    name: String,
    counsellor_emails: Vec<String>,
    validator_emails: Vec<String>,
}

pub struct PgAgencyRepository {
    tx: SharedTransaction,
}

impl PgAgencyRepository {
    pub fn new(tx: SharedTransaction) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl AgencyRepository for PgAgencyRepository {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Agency>, AppError> {
        let mut tx = self.tx.lock().await?;
        let row = sqlx::query_as::<_, AgencyRow>(
            r#"
            SELECT id, name, counsellor_emails, validator_emails
            FROM agencies
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(row.map(|r| Agency {
            id: r.id,
            name: r.name,
            counsellor_emails: r.counsellor_emails,
            validator_emails: r.validator_emails,
        }))
    }
}
