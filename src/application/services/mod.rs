//! Use cases of the application layer.

pub mod magic_link_authority;
pub mod magic_link_renewal_service;
pub mod notification_dispatcher;
pub mod short_link_service;

#[cfg(test)]
pub(crate) mod test_support;

pub use magic_link_authority::{IssueMagicLink, MagicLinkAuthority, make_email_hash};
pub use magic_link_renewal_service::{MagicLinkRenewalService, RenewMagicLink};
pub use notification_dispatcher::NotificationDispatcher;
pub use short_link_service::ShortLinkService;
