//! Repository trait definitions for the domain layer.
//!
//! Repositories are always reached through a
//! [`crate::domain::unit_of_work::UnitOfWork`], so every read and write of one
//! use case shares one transaction.
//!
//! # Available Repositories
//!
//! - [`ShortLinkRepository`] - Short link id to long URL mapping
//! - [`NotificationRepository`] - Notification ledger
//! - [`OutboxRepository`] - Transactional outbox of domain events
//! - [`ConventionRepository`] / [`AgencyRepository`] - Read-only query ports
//!
//! # Testing
//!
//! Mock implementations are generated via `mockall` under `cfg(test)`; the
//! in-memory unit of work in `crate::infrastructure::in_memory` backs the
//! integration tests.

pub mod convention_repository;
pub mod notification_repository;
pub mod outbox_repository;
pub mod short_link_repository;

pub use convention_repository::{AgencyRepository, ConventionRepository};
pub use notification_repository::NotificationRepository;
pub use outbox_repository::{OutboxRepository, OutboxStats};
pub use short_link_repository::ShortLinkRepository;

#[cfg(test)]
pub use convention_repository::{MockAgencyRepository, MockConventionRepository};
#[cfg(test)]
pub use notification_repository::MockNotificationRepository;
#[cfg(test)]
pub use outbox_repository::MockOutboxRepository;
#[cfg(test)]
pub use short_link_repository::MockShortLinkRepository;
