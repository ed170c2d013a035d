//! HTTP request handlers for API endpoints.

pub mod health;
pub mod redirect;
pub mod renew_magic_link;

pub use health::health_handler;
pub use redirect::redirect_handler;
pub use renew_magic_link::renew_magic_link_handler;
