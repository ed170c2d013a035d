//! Top-level router configuration.
//!
//! # Route Structure
//!
//! - `GET  /health`                 - Health check (public)
//! - `GET  /api/to/{short_link_id}` - Short link redirect (public)
//! - `POST /api/renew-magic-link`   - Magic-link renewal (public, rate limited)
//!
//! # Middleware
//!
//! - **Tracing** - Structured request/response logging
//! - **Rate limiting** - Per-IP token bucket on renewal (configurable for proxy deployments)
//! - **Path normalization** - Trailing slash handling

use crate::api;
use crate::api::handlers::health_handler;
use crate::api::middleware::{rate_limit, tracing};
use crate::state::AppState;
use axum::Router;
use axum::routing::get;
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

/// Constructs the application router with all routes and middleware.
///
/// # Arguments
///
/// - `state` - shared application state injected into all handlers
/// - `behind_proxy` - when `true`, rate limiting reads client IP from
///   `X-Forwarded-For` / `X-Real-IP` headers instead of the peer socket address;
///   enable only when the service runs behind a trusted reverse proxy
pub fn app_router(state: AppState, behind_proxy: bool) -> NormalizePath<Router> {
    let renewal = api::routes::renewal_routes();
    let renewal = if behind_proxy {
        renewal.layer(rate_limit::proxied_layer())
    } else {
        renewal.layer(rate_limit::layer())
    };

    let api_router = api::routes::short_link_routes().merge(renewal);

    let router = Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api_router)
        .with_state(state)
        .layer(tracing::layer());

    NormalizePathLayer::trim_trailing_slash().layer(router)
}
