//! Repository trait for short link storage.

use crate::domain::entities::{ShortLink, ShortLinkId};
use crate::error::AppError;
use async_trait::async_trait;

/// Key/value store from short link id to long URL.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgShortLinkRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::in_memory::InMemoryShortLinkRepository`] - in-memory implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShortLinkRepository: Send + Sync {
    /// Persists a new short link.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if the id is already taken.
    /// Returns [`AppError::Internal`] on database errors.
    async fn save(&self, short_link: &ShortLink) -> Result<(), AppError>;

    /// Finds a short link by id.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn get_by_id(&self, id: &ShortLinkId) -> Result<Option<ShortLink>, AppError>;
}
