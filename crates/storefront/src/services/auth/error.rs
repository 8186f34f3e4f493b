//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::email::EmailError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] hoi_core::EmailError),

    /// A required registration or login field was missing.
    #[error("{0}")]
    MissingFields(&'static str),

    /// Wrong password or unknown email.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Email already belongs to an account.
    #[error("Email already registered")]
    EmailTaken,

    /// Password too weak or invalid.
    #[error("{0}")]
    WeakPassword(String),

    #[error("No pending registration for this email")]
    NoPendingRegistration,

    /// The code was correct or not, but it is past its expiry.
    #[error("OTP expired, please register again")]
    OtpExpired,

    #[error("Invalid OTP")]
    InvalidOtp,

    /// Too many wrong codes; the pending registration was dropped.
    #[error("Too many invalid OTP attempts, please register again")]
    OtpAttemptsExceeded,

    #[error("Invalid or expired reset token")]
    InvalidResetToken,

    /// Bearer token missing from the request.
    #[error("No token provided")]
    MissingToken,

    /// Bearer token failed verification or has expired.
    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Admin access only")]
    AdminOnly,

    /// Token could not be signed.
    #[error("token signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    /// Verification email could not be delivered.
    #[error("email delivery failed: {0}")]
    Mail(#[from] EmailError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
