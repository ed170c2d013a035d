//! Handler for short link redirect.

use axum::{
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};

use crate::error::AppError;
use crate::state::AppState;

/// Redirects a short link id to its long URL.
///
/// # Endpoint
///
/// `GET /api/to/{short_link_id}`
///
/// Responds `302 Found`; the long URL carries a magic-link token, so the
/// redirect must never be cached as permanent.
///
/// # Errors
///
/// Returns 404 Not Found if the id is unknown.
pub async fn redirect_handler(
    Path(short_link_id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let long_url = state.short_link_service.resolve(&short_link_id).await?;

    tracing::debug!(%short_link_id, "Redirecting short link");
    Ok((StatusCode::FOUND, [(header::LOCATION, long_url)]))
}
