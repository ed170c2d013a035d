//! Unit-of-work transaction boundary.
//!
//! A use case opens one [`UnitOfWork`] through a [`UnitOfWorkPerformer`],
//! issues all of its repository calls through it, then hands it to
//! [`finish`], which commits on success and rolls back on failure. Either
//! every write of the invocation becomes visible or none does.

use async_trait::async_trait;

use crate::domain::repositories::{
    AgencyRepository, ConventionRepository, NotificationRepository, OutboxRepository,
    ShortLinkRepository,
};
use crate::error::AppError;

/// Repositories bound to one open transaction.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    fn short_links(&self) -> &dyn ShortLinkRepository;
    fn notifications(&self) -> &dyn NotificationRepository;
    fn outbox(&self) -> &dyn OutboxRepository;
    fn conventions(&self) -> &dyn ConventionRepository;
    fn agencies(&self) -> &dyn AgencyRepository;

    /// Makes every write issued through this unit of work durable.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if the commit fails; nothing is persisted then.
    async fn commit(self: Box<Self>) -> Result<(), AppError>;

    /// Discards every write issued through this unit of work.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if the backend reports a rollback failure.
    async fn rollback(self: Box<Self>) -> Result<(), AppError>;
}

/// Opens units of work.
#[async_trait]
pub trait UnitOfWorkPerformer: Send + Sync {
    /// Starts a new transaction.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if no transaction can be opened.
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, AppError>;

    /// Reports whether the backing store accepts new transactions.
    async fn health_check(&self) -> bool;
}

/// Commits `uow` if `outcome` succeeded, rolls it back otherwise.
///
/// # Errors
///
/// Returns the use case error unchanged, or the commit error if the use case
/// succeeded but the commit did not.
pub async fn finish<T>(
    uow: Box<dyn UnitOfWork>,
    outcome: Result<T, AppError>,
) -> Result<T, AppError> {
    match outcome {
        Ok(value) => {
            uow.commit().await?;
            Ok(value)
        }
        Err(error) => {
            if let Err(rollback_error) = uow.rollback().await {
                tracing::warn!(error = %rollback_error, "Rollback failed");
            }
            Err(error)
        }
    }
}
