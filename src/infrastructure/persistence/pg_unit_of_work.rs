//! PostgreSQL unit of work.
//!
//! One database transaction is opened per unit of work and shared by every
//! repository handed out from it. Repositories borrow the transaction through
//! an async mutex for the duration of a single statement.

use async_trait::async_trait;
use serde_json::json;
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMappedMutexGuard, OwnedMutexGuard};

use super::{
    PgAgencyRepository, PgConventionRepository, PgNotificationRepository, PgOutboxRepository,
    PgShortLinkRepository,
};
use crate::domain::repositories::{
    AgencyRepository, ConventionRepository, NotificationRepository, OutboxRepository,
    ShortLinkRepository,
};
use crate::domain::unit_of_work::{UnitOfWork, UnitOfWorkPerformer};
use crate::error::AppError;

type SlotGuard =
    OwnedMappedMutexGuard<Option<Transaction<'static, Postgres>>, Transaction<'static, Postgres>>;

/// Transaction shared by the repositories of one unit of work.
///
/// `None` once the transaction has been committed or rolled back.
#[derive(Clone)]
pub struct SharedTransaction(Arc<Mutex<Option<Transaction<'static, Postgres>>>>);

impl SharedTransaction {
    fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self(Arc::new(Mutex::new(Some(tx))))
    }

    /// Locks the transaction for one statement.
    ///
    /// The guard owns a handle on the slot, so repository futures holding it
    /// across `.await` stay `Send` for every caller lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if the transaction is already closed.
    pub async fn lock(&self) -> Result<SlotGuard, AppError> {
        OwnedMutexGuard::try_map(self.0.clone().lock_owned().await, |tx| tx.as_mut())
            .map_err(|_| AppError::internal("Transaction already closed", json!({})))
    }

    async fn take(&self) -> Result<Transaction<'static, Postgres>, AppError> {
        self.0
            .lock()
            .await
            .take()
            .ok_or_else(|| AppError::internal("Transaction already closed", json!({})))
    }
}

/// Opens PostgreSQL-backed units of work.
pub struct PgUnitOfWorkPerformer {
    pool: Arc<PgPool>,
}

impl PgUnitOfWorkPerformer {
    /// Creates a new performer with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UnitOfWorkPerformer for PgUnitOfWorkPerformer {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, AppError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork::new(SharedTransaction::new(tx))))
    }

    async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1")
            .execute(self.pool.as_ref())
            .await
            .is_ok()
    }
}

pub struct PgUnitOfWork {
    tx: SharedTransaction,
    short_links: PgShortLinkRepository,
    notifications: PgNotificationRepository,
    outbox: PgOutboxRepository,
    conventions: PgConventionRepository,
    agencies: PgAgencyRepository,
}

impl PgUnitOfWork {
    fn new(tx: SharedTransaction) -> Self {
        Self {
            short_links: PgShortLinkRepository::new(tx.clone()),
            notifications: PgNotificationRepository::new(tx.clone()),
            outbox: PgOutboxRepository::new(tx.clone()),
            conventions: PgConventionRepository::new(tx.clone()),
            agencies: PgAgencyRepository::new(tx.clone()),
            tx,
        }
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    fn short_links(&self) -> &dyn ShortLinkRepository {
        &self.short_links
    }

    fn notifications(&self) -> &dyn NotificationRepository {
        &self.notifications
    }

    fn outbox(&self) -> &dyn OutboxRepository {
        &self.outbox
    }

    fn conventions(&self) -> &dyn ConventionRepository {
        &self.conventions
    }

    fn agencies(&self) -> &dyn AgencyRepository {
        &self.agencies
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        self.tx.take().await?.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), AppError> {
        self.tx.take().await?.rollback().await?;
        Ok(())
    }
}
