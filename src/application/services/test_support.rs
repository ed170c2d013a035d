//! Unit of work assembled from repository mocks.

use async_trait::async_trait;
use serde_json::json;
use std::sync::{Arc, Mutex, PoisonError};

use crate::domain::repositories::{
    AgencyRepository, ConventionRepository, MockAgencyRepository, MockConventionRepository,
    MockNotificationRepository, MockOutboxRepository, MockShortLinkRepository,
    NotificationRepository, OutboxRepository, ShortLinkRepository,
};
use crate::domain::unit_of_work::{UnitOfWork, UnitOfWorkPerformer};
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ending {
    Committed,
    RolledBack,
}

#[derive(Default)]
pub struct MockedUnitOfWork {
    pub short_links: MockShortLinkRepository,
    pub notifications: MockNotificationRepository,
    pub outbox: MockOutboxRepository,
    pub conventions: MockConventionRepository,
    pub agencies: MockAgencyRepository,
    ending: Arc<Mutex<Option<Ending>>>,
}

impl MockedUnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to observe how the unit of work ended after it has been consumed.
    pub fn ending(&self) -> Arc<Mutex<Option<Ending>>> {
        self.ending.clone()
    }

    fn end(&self, ending: Ending) {
        *self.ending.lock().unwrap_or_else(PoisonError::into_inner) = Some(ending);
    }
}

#[async_trait]
impl UnitOfWork for MockedUnitOfWork {
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
        self.end(Ending::Committed);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), AppError> {
        self.end(Ending::RolledBack);
        Ok(())
    }
}

/// Hands out a single prepared unit of work.
pub struct MockedPerformer {
    uow: Mutex<Option<MockedUnitOfWork>>,
}

impl MockedPerformer {
    pub fn new(uow: MockedUnitOfWork) -> Self {
        Self {
            uow: Mutex::new(Some(uow)),
        }
    }

    /// A performer whose units of work must never be opened.
    pub fn unused() -> Self {
        Self {
            uow: Mutex::new(None),
        }
    }
}

#[async_trait]
impl UnitOfWorkPerformer for MockedPerformer {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, AppError> {
        let uow = self
            .uow
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| AppError::internal("No unit of work prepared", json!({})))?;
        Ok(Box::new(uow))
    }

    async fn health_check(&self) -> bool {
        true
    }
}

pub fn ending_of(handle: &Arc<Mutex<Option<Ending>>>) -> Option<Ending> {
    *handle.lock().unwrap_or_else(PoisonError::into_inner)
}
