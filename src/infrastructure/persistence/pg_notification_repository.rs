//! PostgreSQL implementation of the notification ledger.
//!
//! Emails and SMS live in separate tables; templated content is stored as
//! JSONB and followed ids as plain columns so they can be indexed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::types::Json;
use uuid::Uuid;

use super::SharedTransaction;
use crate::domain::entities::{
    EmailNotification, FollowedIds, Notification, NotificationKind, SmsNotification,
};
use crate::domain::repositories::NotificationRepository;
use crate::error::AppError;

const INSERT_EMAIL: &str = r#"
    INSERT INTO notifications_email
        (id, created_at, convention_id, agency_id, establishment_siret, templated_content)
    VALUES ($1, $2, $3, $4, $5, $6)
"#;

const INSERT_SMS: &str = r#"
    INSERT INTO notifications_sms
        (id, created_at, convention_id, agency_id, establishment_siret, templated_content)
    VALUES ($1, $2, $3, $4, $5, $6)
"#;

const SELECT_EMAIL: &str = r#"
    SELECT id, created_at, convention_id, agency_id, establishment_siret, templated_content
    FROM notifications_email
    WHERE id = $1
"#;

const SELECT_SMS: &str = r#"
    SELECT id, created_at, convention_id, agency_id, establishment_siret, templated_content
    FROM notifications_sms
    WHERE id = $1
"#;

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    created_at: DateTime<Utc>,
    convention_id: Option<Uuid>,
    agency_id: Option<Uuid>,
    establishment_siret: Option<String>,
    templated_content: Json<Value>,
}

impl NotificationRow {
    fn into_notification(self, kind: NotificationKind) -> Result<Notification, AppError> {
        let followed_ids = FollowedIds {
            convention_id: self.convention_id,
            agency_id: self.agency_id,
            establishment_siret: self.establishment_siret,
        };

        Ok(match kind {
            NotificationKind::Email => Notification::Email(EmailNotification {
                id: self.id,
                created_at: self.created_at,
                followed_ids,
                templated_content: serde_json::from_value(self.templated_content.0)?,
            }),
            NotificationKind::Sms => Notification::Sms(SmsNotification {
                id: self.id,
                created_at: self.created_at,
                followed_ids,
                templated_content: serde_json::from_value(self.templated_content.0)?,
            }),
        })
    }
}

/// PostgreSQL notification repository, bound to one transaction.
pub struct PgNotificationRepository {
    tx: SharedTransaction,
}

impl PgNotificationRepository {
    pub fn new(tx: SharedTransaction) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn save(&self, notification: &Notification) -> Result<(), AppError> {
        let (insert, content) = match notification {
            Notification::Email(email) => {
                (INSERT_EMAIL, serde_json::to_value(&email.templated_content)?)
            }
            Notification::Sms(sms) => (INSERT_SMS, serde_json::to_value(&sms.templated_content)?),
        };
        let followed_ids = notification.followed_ids();

        let mut tx = self.tx.lock().await?;
        sqlx::query(insert)
            .bind(notification.id())
            .bind(notification.created_at())
            .bind(followed_ids.convention_id)
            .bind(followed_ids.agency_id)
            .bind(followed_ids.establishment_siret.as_deref())
            .bind(Json(content))
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    async fn get_by_id_and_kind(
        &self,
        id: Uuid,
        kind: NotificationKind,
    ) -> Result<Option<Notification>, AppError> {
        let select = match kind {
            NotificationKind::Email => SELECT_EMAIL,
            NotificationKind::Sms => SELECT_SMS,
        };

        let mut tx = self.tx.lock().await?;
        let row = sqlx::query_as::<_, NotificationRow>(select)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?;

        row.map(|row| row.into_notification(kind)).transpose()
    }
}
