//! Authentication service.
//!
//! Password registration (direct or through an emailed one-time code),
//! login with bearer tokens, and the forgot/reset password flow.

mod error;
pub mod tokens;

pub use error::AuthError;
pub use tokens::{Claims, TokenKeys};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, Utc};
use rand::RngCore;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use hoi_core::{Email, Role};

use super::email::{Notifier, generate_verification_code, render_otp_code, render_password_reset};
use crate::db::{PendingUserStore, RepositoryError, UserStore};
use crate::models::{NewUser, PendingUser, User};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// How long an emailed registration code stays valid.
pub const OTP_TTL_MINUTES: i64 = 15;

/// Wrong codes allowed before a pending registration is dropped.
pub const MAX_OTP_ATTEMPTS: i32 = 5;

/// How long a password reset link stays valid.
pub const RESET_TOKEN_TTL_MINUTES: i64 = 60;

/// Registration payload, shared by direct and OTP registration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub password: Option<String>,
}

/// Registration fields after presence checks.
struct Registration {
    email: Email,
    name: String,
    phone: String,
    address: String,
    password: String,
}

impl RegisterInput {
    fn validate(&self) -> Result<Registration, AuthError> {
        let field = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
        };
        let (Some(name), Some(email), Some(phone), Some(address), Some(password)) = (
            field(&self.name),
            field(&self.email),
            field(&self.phone),
            field(&self.address),
            self.password.clone().filter(|p| !p.is_empty()),
        ) else {
            return Err(AuthError::MissingFields("All fields are required"));
        };

        let email = Email::parse(&email)?;
        validate_password(&password)?;

        Ok(Registration {
            email,
            name,
            phone,
            address,
            password,
        })
    }
}

/// A successful login.
#[derive(Debug, Clone)]
pub struct Login {
    pub token: String,
    pub user: User,
}

/// Authentication operations.
pub struct AuthService<'a> {
    users: &'a dyn UserStore,
    pending: &'a dyn PendingUserStore,
    notifier: &'a dyn Notifier,
    tokens: &'a TokenKeys,
    frontend_url: &'a str,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(
        users: &'a dyn UserStore,
        pending: &'a dyn PendingUserStore,
        notifier: &'a dyn Notifier,
        tokens: &'a TokenKeys,
        frontend_url: &'a str,
    ) -> Self {
        Self {
            users,
            pending,
            notifier,
            tokens,
            frontend_url,
        }
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a new user immediately.
    ///
    /// # Errors
    ///
    /// Returns `MissingFields`, `InvalidEmail`, `WeakPassword` or
    /// `EmailTaken`.
    #[tracing::instrument(skip_all)]
    pub async fn register(&self, input: &RegisterInput) -> Result<User, AuthError> {
        let reg = input.validate()?;
        let password_hash = hash_password(&reg.password)?;
        let user = self
            .create_user(NewUser {
                email: reg.email,
                password_hash,
                role: Role::User,
                name: reg.name,
                phone: reg.phone,
                address: reg.address,
            })
            .await?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    async fn create_user(&self, new: NewUser) -> Result<User, AuthError> {
        self.users.create(&new).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => AuthError::EmailTaken,
            other => AuthError::Repository(other),
        })
    }

    /// Stage a registration and email a one-time code.
    ///
    /// Asking again for the same email replaces the earlier code.
    ///
    /// # Errors
    ///
    /// Returns the registration validation errors, `EmailTaken`, or `Mail`
    /// when the code cannot be delivered.
    #[tracing::instrument(skip_all)]
    pub async fn request_otp(&self, input: &RegisterInput) -> Result<(), AuthError> {
        let reg = input.validate()?;
        if self.users.find_by_email(&reg.email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let otp = generate_verification_code();
        let pending = PendingUser {
            email: reg.email,
            name: reg.name,
            phone: reg.phone,
            address: reg.address,
            password_hash: hash_password(&reg.password)?,
            otp_hash: hash_token(&otp),
            otp_expires_at: Utc::now() + Duration::minutes(OTP_TTL_MINUTES),
            otp_attempts: 0,
        };
        self.pending.upsert(&pending).await?;

        let email = render_otp_code(&pending.name, &otp, OTP_TTL_MINUTES)?;
        self.notifier.send(pending.email.as_str(), &email).await?;

        tracing::info!("Registration code sent");
        Ok(())
    }

    /// Finish an OTP registration.
    ///
    /// An expired code, or the `MAX_OTP_ATTEMPTS`th wrong one, removes the
    /// pending registration so the user must start over.
    ///
    /// # Errors
    ///
    /// Returns `NoPendingRegistration`, `OtpExpired`, `InvalidOtp`,
    /// `OtpAttemptsExceeded` or `EmailTaken`.
    #[tracing::instrument(skip_all)]
    pub async fn verify_otp(&self, email: &str, otp: &str) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        let pending = self
            .pending
            .find(&email)
            .await?
            .ok_or(AuthError::NoPendingRegistration)?;

        if pending.is_expired(Utc::now()) {
            self.pending.delete(&email).await?;
            tracing::info!("Expired registration code presented, pending record removed");
            return Err(AuthError::OtpExpired);
        }
        if !constant_time_compare(&hash_token(otp.trim()), &pending.otp_hash) {
            let attempts = self.pending.record_failed_attempt(&email).await?;
            if attempts >= MAX_OTP_ATTEMPTS {
                self.pending.delete(&email).await?;
                tracing::warn!(attempts, "Too many wrong registration codes, pending record removed");
                return Err(AuthError::OtpAttemptsExceeded);
            }
            return Err(AuthError::InvalidOtp);
        }

        let user = self
            .create_user(NewUser {
                email: pending.email,
                password_hash: pending.password_hash,
                role: Role::User,
                name: pending.name,
                phone: pending.phone,
                address: pending.address,
            })
            .await?;
        self.pending.delete(&email).await?;

        tracing::info!(user_id = %user.id, "User registered via OTP");
        Ok(user)
    }

    // =========================================================================
    // Login
    // =========================================================================

    /// Check credentials and issue a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `MissingFields` or `InvalidCredentials`.
    #[tracing::instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> Result<Login, AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingFields("Email and password are required"));
        }
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        verify_password(password, &user.password_hash)?;

        let token = self.tokens.issue(&user)?;
        tracing::info!(user_id = %user.id, "User logged in");
        Ok(Login { token, user })
    }

    // =========================================================================
    // Password reset
    // =========================================================================

    /// Email a reset link if the account exists.
    ///
    /// Succeeds whether or not the email is registered, and delivery
    /// failures are only logged, so callers cannot tell which emails have accounts.
    ///
    /// # Errors
    ///
    /// Returns `Repository` on database failure.
    #[tracing::instrument(skip_all)]
    pub async fn forgot_password(&self, email: &str) -> Result<(), AuthError> {
        let Ok(email) = Email::parse(email) else {
            return Ok(());
        };
        let Some(user) = self.users.find_by_email(&email).await? else {
            tracing::debug!("Password reset requested for unknown email");
            return Ok(());
        };

        let token = generate_reset_token();
        let expires_at = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);
        self.users
            .set_reset_token(user.id, &hash_token(&token), expires_at)
            .await?;

        let reset_url = format!("{}/reset-password/{token}", self.frontend_url);
        match render_password_reset(&user.name, &reset_url) {
            Ok(message) => {
                if let Err(e) = self.notifier.send(user.email.as_str(), &message).await {
                    tracing::error!(user_id = %user.id, error = %e, "Failed to send password reset email");
                }
            }
            Err(e) => {
                tracing::error!(user_id = %user.id, error = %e, "Failed to render password reset email");
            }
        }
        Ok(())
    }

    /// Set a new password using an emailed reset token.
    ///
    /// # Errors
    ///
    /// Returns `WeakPassword` or `InvalidResetToken`.
    #[tracing::instrument(skip_all)]
    pub async fn reset_password(&self, token: &str, password: &str) -> Result<(), AuthError> {
        validate_password(password)?;
        let user = self
            .users
            .find_by_reset_token(&hash_token(token.trim()), Utc::now())
            .await?
            .ok_or(AuthError::InvalidResetToken)?;

        let password_hash = hash_password(password)?;
        self.users.update_password(user.id, &password_hash).await?;

        tracing::info!(user_id = %user.id, "Password reset");
        Ok(())
    }
}

/// Random URL-safe reset token.
fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Hex SHA-256 of a reset token, as stored on the account.
#[must_use]
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Compare two strings without stopping at the first differing byte.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Validate password requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
