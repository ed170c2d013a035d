//! PostgreSQL implementation of the transactional outbox.
//!
//! Rows are written inside the caller's transaction, so an event becomes
//! visible to dispatchers exactly when the state change that produced it
//! commits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use sqlx::types::Json;
use uuid::Uuid;

use super::SharedTransaction;
use crate::domain::entities::{DomainEvent, EventPublication, EventStatus};
use crate::domain::repositories::{OutboxRepository, OutboxStats};
use crate::error::AppError;

#[derive(sqlx::FromRow)]
struct OutboxRow {
    id: Uuid,
    topic: String,
    payload: Json<Value>,
    occurred_at: DateTime<Utc>,
    status: String,
    publications: Json<Vec<EventPublication>>,
    was_quarantined: bool,
}

impl TryFrom<OutboxRow> for DomainEvent {
    type Error = AppError;

    fn try_from(row: OutboxRow) -> Result<Self, Self::Error> {
        let status = EventStatus::parse(&row.status).ok_or_else(|| {
            AppError::internal(
                "Unknown outbox event status",
                json!({ "event_id": row.id, "status": row.status }),
            )
        })?;
        let payload = serde_json::from_value(json!({
            "topic": row.topic,
            "payload": row.payload.0,
        }))?;

        Ok(DomainEvent {
            id: row.id,
            occurred_at: row.occurred_at,
            payload,
            status,
            publications: row.publications.0,
            was_quarantined: row.was_quarantined,
        })
    }
}

/// The untagged payload body; the topic goes to its own column.
fn payload_body(event: &DomainEvent) -> Result<Value, AppError> {
    let mut tagged = serde_json::to_value(&event.payload)?;
    Ok(tagged
        .get_mut("payload")
        .map(Value::take)
        .unwrap_or(Value::Null))
}

#[derive(sqlx::FromRow)]
struct StatsRow {
    never_published: i64,
    in_process: i64,
    published: i64,
    quarantined: i64,
}

/// PostgreSQL outbox repository, bound to one transaction.
pub struct PgOutboxRepository {
    tx: SharedTransaction,
}

impl PgOutboxRepository {
    pub fn new(tx: SharedTransaction) -> Self {
        Self { tx }
    }

    async fn fetch_many(&self, sql: &str, limit: i64) -> Result<Vec<DomainEvent>, AppError> {
        let mut tx = self.tx.lock().await?;
        let rows = sqlx::query_as::<_, OutboxRow>(sql)
            .bind(limit)
            .fetch_all(&mut **tx)
            .await?;

        rows.into_iter().map(DomainEvent::try_from).collect()
    }
}

#[async_trait]
impl OutboxRepository for PgOutboxRepository {
    async fn save(&self, event: &DomainEvent) -> Result<(), AppError> {
        let payload = payload_body(event)?;

        let mut tx = self.tx.lock().await?;
        sqlx::query(
            r#"
            INSERT INTO outbox (id, topic, payload, occurred_at, status, publications, was_quarantined)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(event.id)
        .bind(event.topic().as_str())
        .bind(Json(payload))
        .bind(event.occurred_at)
        .bind(event.status.as_str())
        .bind(Json(&event.publications))
        .bind(event.was_quarantined)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn update(&self, event: &DomainEvent) -> Result<(), AppError> {
        let mut tx = self.tx.lock().await?;
        let result = sqlx::query(
            r#"
            UPDATE outbox
            SET status = $2, publications = $3, was_quarantined = $4
            WHERE id = $1
            "#,
        )
        .bind(event.id)
        .bind(event.status.as_str())
        .bind(Json(&event.publications))
        .bind(event.was_quarantined)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(
                "Event not found",
                json!({ "event_id": event.id }),
            ));
        }

        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<DomainEvent>, AppError> {
        let mut tx = self.tx.lock().await?;
        let row = sqlx::query_as::<_, OutboxRow>(
            r#"
            SELECT id, topic, payload, occurred_at, status, publications, was_quarantined
            FROM outbox
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

        row.map(DomainEvent::try_from).transpose()
    }

    async fn get_events_to_publish(&self, limit: i64) -> Result<Vec<DomainEvent>, AppError> {
        self.fetch_many(
            r#"
            SELECT id, topic, payload, occurred_at, status, publications, was_quarantined
            FROM outbox
            WHERE status = 'never-published' AND NOT was_quarantined
            ORDER BY occurred_at
            LIMIT $1
            FOR UPDATE SKIP LOCKED
            "#,
            limit,
        )
        .await
    }

    async fn get_quarantined(&self, limit: i64) -> Result<Vec<DomainEvent>, AppError> {
        self.fetch_many(
            r#"
            SELECT id, topic, payload, occurred_at, status, publications, was_quarantined
            FROM outbox
            WHERE was_quarantined
            ORDER BY occurred_at
            LIMIT $1
            "#,
            limit,
        )
        .await
    }

    async fn stats(&self) -> Result<OutboxStats, AppError> {
        let mut tx = self.tx.lock().await?;
        let row = sqlx::query_as::<_, StatsRow>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status = 'never-published' AND NOT was_quarantined) AS never_published,
                COUNT(*) FILTER (WHERE status = 'in-process' AND NOT was_quarantined) AS in_process,
                COUNT(*) FILTER (WHERE status = 'published' AND NOT was_quarantined) AS published,
                COUNT(*) FILTER (WHERE was_quarantined) AS quarantined
            FROM outbox
            "#,
        )
        .fetch_one(&mut **tx)
        .await?;

        Ok(OutboxStats {
            never_published: row.never_published,
            in_process: row.in_process,
            published: row.published,
            quarantined: row.quarantined,
        })
    }
}
