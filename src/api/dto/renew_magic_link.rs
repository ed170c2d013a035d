//! DTO for the magic-link renewal endpoint.

use serde::Deserialize;
use validator::Validate;

use crate::application::services::RenewMagicLink;

/// Body of `POST /api/renew-magic-link`.
///
/// ```json
/// {
///   "expiredJwt": "eyJhbGciOiJIUzI1NiJ9...",
///   "originalUrl": "https://immersion.example.com/demande-immersion?jwt=..."
/// }
/// ```
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RenewMagicLinkRequest {
    #[validate(length(min = 1, message = "expiredJwt must not be empty"))]
    pub expired_jwt: String,

    #[validate(length(min = 1, message = "originalUrl must not be empty"))]
    pub original_url: String,
}

impl From<RenewMagicLinkRequest> for RenewMagicLink {
    fn from(request: RenewMagicLinkRequest) -> Self {
        RenewMagicLink {
            expired_jwt: request.expired_jwt,
            original_url: request.original_url,
        }
    }
}
