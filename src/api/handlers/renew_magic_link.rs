//! Handler for magic-link renewal.

use axum::{Json, extract::State, http::StatusCode};
use validator::Validate;

use crate::api::dto::renew_magic_link::RenewMagicLinkRequest;
use crate::error::AppError;
use crate::state::AppState;

/// Sends fresh magic links to the recipients of an expired one.
///
/// # Endpoint
///
/// `POST /api/renew-magic-link`
///
/// # Request Body
///
/// ```json
/// {
///   "expiredJwt": "eyJhbGciOiJIUzI1NiJ9...",
///   "originalUrl": "https://immersion.example.com/bilan-immersion?jwt=..."
/// }
/// ```
///
/// # Response Codes
///
/// - **204 No Content**: links sent
/// - **400 Bad Request**: malformed token, unsupported role or route, stale link
/// - **403 Forbidden**: token not signed by a known key
/// - **404 Not Found**: unknown convention
pub async fn renew_magic_link_handler(
    State(state): State<AppState>,
    Json(payload): Json<RenewMagicLinkRequest>,
) -> Result<StatusCode, AppError> {
    payload.validate()?;

    state.renewal_service.renew(payload.into()).await?;

    Ok(StatusCode::NO_CONTENT)
}
