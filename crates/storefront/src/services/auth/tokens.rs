//! Signed bearer tokens.
//!
//! HS256 JWTs carrying the user id, email and role. Keys are derived once
//! from the configured secret and shared through application state.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use hoi_core::{Role, UserId};

use super::AuthError;
use crate::models::{AuthUser, User};

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: i32,
    pub email: String,
    pub role: Role,
    /// Issued at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

/// Signing and verification keys with the token lifetime.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenKeys {
    #[must_use]
    pub fn new(secret: &SecretString, ttl_days: i64) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        let mut validation = Validation::default();
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            validation,
            ttl: Duration::days(ttl_days),
        }
    }

    /// Sign a token for `user`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Signing` if encoding fails.
    pub fn issue(&self, user: &User) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.as_i32(),
            email: user.email.as_str().to_owned(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    /// Verify a token and return the caller it names.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` for a bad signature, a malformed
    /// token or an expired one.
    pub fn verify(&self, token: &str) -> Result<AuthUser, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            AuthError::InvalidToken
        })?;
        Ok(AuthUser {
            id: UserId::new(data.claims.sub),
            email: data.claims.email,
            role: data.claims.role,
        })
    }
}
