//! User repository for database operations.
//!
//! Queries are checked at runtime (`query_as` with `FromRow` rows) so the
//! crate builds without a live database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use hoi_core::{Email, Role, UserId};

use super::{RepositoryError, UserStore};
use crate::models::{NewUser, SavedAddress, User};

const USER_COLUMNS: &str = "id, email, password_hash, role, name, phone, address, profile_image, \
     addresses, reset_token_hash, reset_token_expires_at, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i32,
    email: String,
    password_hash: String,
    role: Role,
    name: String,
    phone: String,
    address: String,
    profile_image: String,
    addresses: Json<Vec<SavedAddress>>,
    reset_token_hash: Option<String>,
    reset_token_expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&r.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(r.id),
            email,
            password_hash: r.password_hash,
            role: r.role,
            name: r.name,
            phone: r.phone,
            address: r.address,
            profile_image: r.profile_image,
            addresses: r.addresses.0,
            reset_token_hash: r.reset_token_hash,
            reset_token_expires_at: r.reset_token_expires_at,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepository<'_> {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id.as_i32())
            .fetch_optional(self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(email.as_str())
            .fetch_optional(self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_by_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, RepositoryError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE reset_token_hash = $1 AND reset_token_expires_at > $2"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(token_hash)
            .bind(now)
            .fetch_optional(self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn create(&self, user: &NewUser) -> Result<User, RepositoryError> {
        let sql = format!(
            "INSERT INTO users (email, password_hash, role, name, phone, address) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(user.email.as_str())
            .bind(&user.password_hash)
            .bind(user.role)
            .bind(&user.name)
            .bind(&user.phone)
            .bind(&user.address)
            .fetch_one(self.pool)
            .await
            .map_err(|e| RepositoryError::from_insert(e, "email"))?;

        User::try_from(row)
    }

    async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC");
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .fetch_all(self.pool)
            .await?;
        rows.into_iter().map(User::try_from).collect()
    }

    async fn delete(&self, id: UserId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_i32())
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn save_addresses(
        &self,
        id: UserId,
        addresses: &[SavedAddress],
    ) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE users SET addresses = $2, updated_at = NOW() WHERE id = $1")
                .bind(id.as_i32())
                .bind(Json(addresses))
                .execute(self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE users SET reset_token_hash = $2, reset_token_expires_at = $3, \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(id.as_i32())
        .bind(token_hash)
        .bind(expires_at)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE users SET password_hash = $2, reset_token_hash = NULL, \
             reset_token_expires_at = NULL, updated_at = NOW() WHERE id = $1",
        )
        .bind(id.as_i32())
        .bind(password_hash)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    async fn set_role(&self, id: UserId, role: Role) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1")
            .bind(id.as_i32())
            .bind(role)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
