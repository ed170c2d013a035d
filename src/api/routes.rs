//! API route configuration.
//!
//! Nested under `/api` by [`crate::routes::app_router`], which also attaches
//! the rate limiter to [`renewal_routes`].

use crate::api::handlers::{redirect_handler, renew_magic_link_handler};
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

/// `GET /to/{short_link_id}` - Redirect a short link to its long URL
pub fn short_link_routes() -> Router<AppState> {
    Router::new().route("/to/{short_link_id}", get(redirect_handler))
}

/// `POST /renew-magic-link` - Send fresh magic links for an expired one
pub fn renewal_routes() -> Router<AppState> {
    Router::new().route("/renew-magic-link", post(renew_magic_link_handler))
}
