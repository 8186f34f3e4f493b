//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use hoi_core::{Email, Role, UserId};

use super::address::SavedAddress;

/// A registered account.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    /// Argon2 PHC string.
    pub password_hash: String,
    pub role: Role,
    pub name: String,
    pub phone: String,
    /// Free-text address captured at registration.
    pub address: String,
    pub profile_image: String,
    pub addresses: Vec<SavedAddress>,
    /// Hex SHA-256 of the outstanding password reset token.
    pub reset_token_hash: Option<String>,
    pub reset_token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Address marked as default, if the book is non-empty.
    #[must_use]
    pub fn default_address(&self) -> Option<&SavedAddress> {
        self.addresses.iter().find(|a| a.is_default)
    }
}

/// Fields required to create an account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    pub password_hash: String,
    pub role: Role,
    pub name: String,
    pub phone: String,
    pub address: String,
}

/// A registration waiting for its emailed one-time code.
#[derive(Debug, Clone)]
pub struct PendingUser {
    pub email: Email,
    pub name: String,
    pub phone: String,
    pub address: String,
    /// Argon2 hash of the chosen password. The plain password is never stored.
    pub password_hash: String,
    /// SHA-256 hex of the emailed code.
    pub otp_hash: String,
    pub otp_expires_at: DateTime<Utc>,
    /// Wrong codes presented so far.
    pub otp_attempts: i32,
}

impl PendingUser {
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.otp_expires_at
    }
}

/// Public view of an account.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub phone: String,
    pub address: String,
    pub role: Role,
    pub profile_image: String,
    pub addresses: Vec<SavedAddress>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            address: user.address.clone(),
            role: user.role,
            profile_image: user.profile_image.clone(),
            addresses: user.addresses.clone(),
            created_at: user.created_at,
        }
    }
}

/// Caller identity decoded from a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: UserId,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
