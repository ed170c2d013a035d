//! Domain layer containing business entities and persistence contracts.
//!
//! # Architecture
//!
//! - [`entities`] - Core data structures (short links, notifications, events, claims)
//! - [`repositories`] - Data access trait definitions
//! - [`unit_of_work`] - Transaction boundary grouping the repositories
//! - [`clock`] - Time source abstraction
//!
//! # Design Principles
//!
//! - Domain layer has no dependencies on infrastructure or presentation layers
//! - Repository traits define contracts implemented by infrastructure layer
//! - Use cases live in [`crate::application::services`]
//!
//! # Dispatch Flow
//!
//! 1. A use case opens a unit of work
//! 2. It shortens the magic links it needs ([`repositories::ShortLinkRepository`])
//! 3. It saves a notification ([`repositories::NotificationRepository`]) and the
//!    paired `NotificationAdded` event ([`repositories::OutboxRepository`])
//! 4. The unit of work commits; an external dispatcher later polls the outbox

pub mod clock;
pub mod entities;
pub mod repositories;
pub mod unit_of_work;
