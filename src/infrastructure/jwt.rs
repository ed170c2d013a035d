//! HS256 JWT signing and verification.
//!
//! Thin wrapper over `jsonwebtoken` that reduces verification failures to
//! the three outcomes the magic-link trust classification cares about.

use std::collections::HashSet;
use std::fmt;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::Serialize;
use serde_json::{Value, json};

use crate::error::AppError;

/// Why a token failed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JwtVerifyError {
    /// Signature valid, expiry in the past.
    Expired,
    /// Signature does not match this key, or claims fail validation.
    Invalid,
    /// Not structurally a JWT.
    Malformed,
}

/// A signing secret usable for both issuing and verifying tokens.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("JwtKeys(<redacted>)")
    }
}

impl JwtKeys {
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    /// Signs `claims` with HS256.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if the claims cannot be serialized.
    pub fn sign<T: Serialize>(&self, claims: &T) -> Result<String, AppError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding).map_err(|e| {
            AppError::internal("Failed to sign token", json!({ "reason": e.to_string() }))
        })
    }

    /// Verifies signature and expiry, returning the raw claims.
    pub fn verify(&self, token: &str) -> Result<Value, JwtVerifyError> {
        self.decode_with(token, validation(true))
    }

    /// Verifies the signature only; an expired token still decodes.
    pub fn verify_ignoring_expiry(&self, token: &str) -> Result<Value, JwtVerifyError> {
        self.decode_with(token, validation(false))
    }

    fn decode_with(&self, token: &str, validation: Validation) -> Result<Value, JwtVerifyError> {
        decode::<Value>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => JwtVerifyError::Expired,
                ErrorKind::InvalidToken
                | ErrorKind::Base64(_)
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_)
                | ErrorKind::MissingRequiredClaim(_) => JwtVerifyError::Malformed,
                _ => JwtVerifyError::Invalid,
            })
    }
}

fn validation(validate_exp: bool) -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.validate_exp = validate_exp;
    validation.required_spec_claims = HashSet::from(["exp".to_string()]);
    validation
}
