//! Admin account management commands.
//!
//! # Usage
//!
//! ```bash
//! # Promote an account that registered through the shop
//! hoi-cli admin promote -e owner@example.com
//!
//! # Create an admin account directly
//! hoi-cli admin create -e owner@example.com -n "Shop Owner" -p 'long passphrase'
//! ```
//!
//! # Environment Variables
//!
//! - `HOI_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

use hoi_core::{Email, Role};
use hoi_storefront::db::{RepositoryError, UserRepository, UserStore};
use hoi_storefront::models::NewUser;
use hoi_storefront::services::auth::{AuthError, hash_password};
use thiserror::Error;

use super::{ConnectError, connect};

/// Minimum length of an admin password set from the command line.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("Password must be at least {MIN_PASSWORD_LENGTH} characters")]
    WeakPassword,

    #[error("Failed to hash password: {0}")]
    Password(#[from] AuthError),

    /// No account with this email.
    #[error("No account with email: {0}")]
    UnknownUser(String),

    /// User already exists.
    #[error("An account already exists with email: {0}")]
    UserExists(String),
}

fn parse_email(email: &str) -> Result<Email, AdminError> {
    Email::parse(email).map_err(|_| AdminError::InvalidEmail(email.to_owned()))
}

/// Give an existing account the admin role.
///
/// # Errors
///
/// Returns `UnknownUser` when nobody registered with this email.
pub async fn promote(email: &str) -> Result<(), AdminError> {
    let email = parse_email(email)?;
    let pool = connect().await?;
    let users = UserRepository::new(&pool);

    let user = users
        .find_by_email(&email)
        .await?
        .ok_or_else(|| AdminError::UnknownUser(email.to_string()))?;

    if user.role == Role::Admin {
        tracing::info!(user_id = %user.id, "Account is already an admin");
        return Ok(());
    }

    users.set_role(user.id, Role::Admin).await?;
    tracing::info!(user_id = %user.id, email = %email, "Account promoted to admin");
    Ok(())
}

/// Create a new admin account.
///
/// # Returns
///
/// The ID of the created account.
///
/// # Errors
///
/// Returns `UserExists` when the email is taken.
pub async fn create_user(email: &str, name: &str, password: &str) -> Result<i32, AdminError> {
    let email = parse_email(email)?;
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AdminError::WeakPassword);
    }

    let pool = connect().await?;
    let users = UserRepository::new(&pool);

    if users.find_by_email(&email).await?.is_some() {
        return Err(AdminError::UserExists(email.to_string()));
    }

    let user = users
        .create(&NewUser {
            email,
            password_hash: hash_password(password)?,
            role: Role::Admin,
            name: name.trim().to_owned(),
            phone: String::new(),
            address: String::new(),
        })
        .await?;

    tracing::info!(
        "Admin account created successfully! ID: {}, Email: {}",
        user.id,
        user.email
    );
    Ok(user.id.as_i32())
}
