//! Application layer services implementing business logic.
//!
//! Services open a unit of work per invocation, or join the caller's when
//! given one, and coordinate repository calls through it.
//!
//! # Available Services
//!
//! - [`services::ShortLinkService`] - Short link creation and resolution
//! - [`services::NotificationDispatcher`] - Notification + outbox event pairing
//! - [`services::MagicLinkAuthority`] - Token issuance and trust classification
//! - [`services::MagicLinkRenewalService`] - Expired magic link renewal

pub mod services;
