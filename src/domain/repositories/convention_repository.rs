//! Read-only query ports for conventions and agencies.
//!
//! Conventions and agencies are owned by other parts of the platform; this
//! crate only reads them to resolve who a magic link belongs to.

use crate::domain::entities::{Agency, Convention};
use crate::error::AppError;
use async_trait::async_trait;
use uuid::Uuid;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConventionRepository: Send + Sync {
    /// Finds a convention by id.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Convention>, AppError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AgencyRepository: Send + Sync {
    /// Finds an agency by id.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Agency>, AppError>;
}
