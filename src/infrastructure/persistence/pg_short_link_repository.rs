//! PostgreSQL implementation of short link repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::SharedTransaction;
use crate::domain::entities::{ShortLink, ShortLinkId};
use crate::domain::repositories::ShortLinkRepository;
use crate::error::AppError;

#[derive(sqlx::FromRow)]
struct ShortLinkRow {
    id: String,
    long_url: String,
    created_at: DateTime<Utc>,
}

impl From<ShortLinkRow> for ShortLink {
    fn from(row: ShortLinkRow) -> Self {
        ShortLink::new(ShortLinkId::new(row.id), row.long_url, row.created_at)
    }
}

/// PostgreSQL repository for short links, bound to one transaction.
pub struct PgShortLinkRepository {
    tx: SharedTransaction,
}

impl PgShortLinkRepository {
    pub fn new(tx: SharedTransaction) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl ShortLinkRepository for PgShortLinkRepository {
    async fn save(&self, short_link: &ShortLink) -> Result<(), AppError> {
        let mut tx = self.tx.lock().await?;

        sqlx::query(
            r#"
            INSERT INTO short_links (id, long_url, created_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(short_link.id.as_str())
        .bind(&short_link.long_url)
        .bind(short_link.created_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn get_by_id(&self, id: &ShortLinkId) -> Result<Option<ShortLink>, AppError> {
        let mut tx = self.tx.lock().await?;

        let row = sqlx::query_as::<_, ShortLinkRow>(
            r#"
            SELECT id, long_url, created_at
            FROM short_links
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&mut **tx)
        .await?;

        Ok(row.map(ShortLink::from))
    }
}
