//! PostgreSQL repository implementations.
//!
//! Every repository is bound to the transaction of the unit of work that
//! created it; none of them touch the pool directly.
//!
//! # Repositories
//!
//! - [`PgUnitOfWorkPerformer`] / [`PgUnitOfWork`] - Transaction lifecycle
//! - [`PgShortLinkRepository`] - Short link storage and lookup
//! - [`PgNotificationRepository`] - Email and SMS notification ledger
//! - [`PgOutboxRepository`] - Domain event outbox
//! - [`PgConventionRepository`] / [`PgAgencyRepository`] - Read-only query ports

pub mod pg_convention_repository;
pub mod pg_notification_repository;
pub mod pg_outbox_repository;
pub mod pg_short_link_repository;
pub mod pg_unit_of_work;

pub use pg_convention_repository::{PgAgencyRepository, PgConventionRepository};
pub use pg_notification_repository::PgNotificationRepository;
pub use pg_outbox_repository::PgOutboxRepository;
pub use pg_short_link_repository::PgShortLinkRepository;
pub use pg_unit_of_work::{PgUnitOfWork, PgUnitOfWorkPerformer, SharedTransaction};
