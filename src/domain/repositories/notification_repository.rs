//! Repository trait for the notification ledger.

use crate::domain::entities::{Notification, NotificationKind};
use crate::error::AppError;
use async_trait::async_trait;
use uuid::Uuid;

/// Persists rendered notifications.
///
/// Only [`crate::application::services::NotificationDispatcher`] writes here,
/// always alongside the matching outbox event.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Persists a notification.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if a notification with the same id and kind exists.
    /// Returns [`AppError::Internal`] on database errors.
    async fn save(&self, notification: &Notification) -> Result<(), AppError>;

    /// Finds a notification by id and kind.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn get_by_id_and_kind(
        &self,
        id: Uuid,
        kind: NotificationKind,
    ) -> Result<Option<Notification>, AppError>;
}
