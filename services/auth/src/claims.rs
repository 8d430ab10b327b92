//! Bearer token claims decoding
//!
//! The client never holds the signing key, so tokens are decoded without
//! signature verification. What the client does enforce is the shape of the
//! payload: every identity claim plus a usable expiry must be present.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::SessionUser;

/// Errors raised while decoding a bearer token
#[derive(Debug, Error)]
pub enum TokenError {
    /// The token is not a JWT or its payload lacks a required claim
    #[error("Malformed token: {0}")]
    Malformed(#[from] jsonwebtoken::errors::Error),

    /// A required claim is present but empty
    #[error("Token claim `{0}` is empty")]
    EmptyClaim(&'static str),

    /// The expiry claim cannot be represented as a timestamp
    #[error("Token expiry {0} is out of range")]
    InvalidExpiry(i64),
}

/// Claims issued by the backend's mobile auth endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub id: String,
    /// Display name
    pub username: String,
    /// Role granted by the backend (e.g. "user", "admin")
    pub role: String,
    /// Expiration time, seconds since the Unix epoch
    pub exp: i64,
}

impl Claims {
    /// Decode and validate the claims carried by `token`
    pub fn decode(token: &str) -> Result<Self, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        // Expiry is checked by the session manager against its own clock.
        validation.validate_exp = false;
        validation.validate_aud = false;

        let data = decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)?;
        let claims = data.claims;

        if claims.id.trim().is_empty() {
            return Err(TokenError::EmptyClaim("id"));
        }
        if claims.username.trim().is_empty() {
            return Err(TokenError::EmptyClaim("username"));
        }
        claims.expires_at()?;

        Ok(claims)
    }

    /// Expiry as a timestamp
    pub fn expires_at(&self) -> Result<DateTime<Utc>, TokenError> {
        DateTime::<Utc>::from_timestamp(self.exp, 0).ok_or(TokenError::InvalidExpiry(self.exp))
    }

    /// Whether the token is expired at `now`
    ///
    /// A token whose expiry equals `now` counts as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.exp.saturating_mul(1000) <= now.timestamp_millis()
    }

    pub fn user(&self) -> SessionUser {
        SessionUser {
            id: self.id.clone(),
            username: self.username.clone(),
            role: self.role.clone(),
        }
    }
}
