//! Core domain entities.
//!
//! Entities are plain data structures; the only behaviour they carry is the
//! invariant-keeping kind (deduplicating recipients, refusing publication
//! attempts on a published event, decoding claims by discriminant).
//!
//! # Entity Types
//!
//! - [`ShortLink`] - An opaque id redirecting to a long URL
//! - [`Notification`] - A rendered email or SMS awaiting delivery
//! - [`DomainEvent`] - An outbox entry with its publication history
//! - [`MagicLinkClaims`] - Decoded magic-link token claims
//! - [`Convention`] / [`Agency`] - Read models used to resolve recipients

pub mod agency;
pub mod convention;
pub mod domain_event;
pub mod magic_link;
pub mod notification;
pub mod role;
pub mod short_link;

pub use agency::Agency;
pub use convention::{Actor, Convention, InternshipKind, Signatories};
pub use domain_event::{
    DomainEvent, EventPayload, EventPublication, EventStatus, MAX_PUBLICATION_ATTEMPTS,
    MagicLinkRenewalRequestedPayload, NotificationAddedPayload, Topic,
};
pub use magic_link::{
    CURRENT_CLAIMS_VERSION, CurrentClaims, FrontRoute, LegacyClaims, MagicLinkClaims,
    PartialClaims, RENEWABLE_ROUTES, TokenClassification,
};
pub use notification::{
    EmailNotification, FollowedIds, Notification, NotificationDraft, NotificationKind,
    SmsNotification, TemplatedEmail, TemplatedSms,
};
pub use role::Role;
pub use short_link::{ShortLink, ShortLinkId};
