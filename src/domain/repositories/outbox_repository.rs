//! Repository trait for the transactional outbox.

use crate::domain::entities::DomainEvent;
use crate::error::AppError;
use async_trait::async_trait;
use uuid::Uuid;

/// Event counts per publication state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutboxStats {
    pub never_published: i64,
    pub in_process: i64,
    pub published: i64,
    pub quarantined: i64,
}

/// Append-only log of domain events.
///
/// Events are never deleted; dispatchers only update their publication state.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OutboxRepository: Send + Sync {
    /// Appends a new event.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if an event with the same id exists.
    /// Returns [`AppError::Internal`] on database errors.
    async fn save(&self, event: &DomainEvent) -> Result<(), AppError>;

    /// Stores the publication state of an existing event.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the event does not exist.
    /// Returns [`AppError::Internal`] on database errors.
    async fn update(&self, event: &DomainEvent) -> Result<(), AppError>;

    /// Finds an event by id.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn get_by_id(&self, id: Uuid) -> Result<Option<DomainEvent>, AppError>;

    /// Returns never-published, non-quarantined events, oldest first. Events
    /// already claimed with `mark_in_process` are not returned.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn get_events_to_publish(&self, limit: i64) -> Result<Vec<DomainEvent>, AppError>;

    /// Returns quarantined events, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn get_quarantined(&self, limit: i64) -> Result<Vec<DomainEvent>, AppError>;

    /// Counts events per publication state.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn stats(&self) -> Result<OutboxStats, AppError>;
}
