//! Pending registration repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use hoi_core::Email;

use super::{PendingUserStore, RepositoryError};
use crate::models::PendingUser;

#[derive(sqlx::FromRow)]
struct PendingUserRow {
    email: String,
    name: String,
    phone: String,
    address: String,
    password_hash: String,
    otp_hash: String,
    otp_expires_at: DateTime<Utc>,
    otp_attempts: i32,
}

impl TryFrom<PendingUserRow> for PendingUser {
    type Error = RepositoryError;

    fn try_from(r: PendingUserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&r.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            email,
            name: r.name,
            phone: r.phone,
            address: r.address,
            password_hash: r.password_hash,
            otp_hash: r.otp_hash,
            otp_expires_at: r.otp_expires_at,
            otp_attempts: r.otp_attempts,
        })
    }
}

/// Repository for registrations awaiting OTP verification.
pub struct PendingUserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PendingUserRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PendingUserStore for PendingUserRepository<'_> {
    async fn upsert(&self, pending: &PendingUser) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO pending_users
                (email, name, phone, address, password_hash, otp_hash, otp_expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (email) DO UPDATE SET
                name = EXCLUDED.name,
                phone = EXCLUDED.phone,
                address = EXCLUDED.address,
                password_hash = EXCLUDED.password_hash,
                otp_hash = EXCLUDED.otp_hash,
                otp_expires_at = EXCLUDED.otp_expires_at,
                otp_attempts = 0,
                updated_at = NOW()
            ",
        )
        .bind(pending.email.as_str())
        .bind(&pending.name)
        .bind(&pending.phone)
        .bind(&pending.address)
        .bind(&pending.password_hash)
        .bind(&pending.otp_hash)
        .bind(pending.otp_expires_at)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    async fn find(&self, email: &Email) -> Result<Option<PendingUser>, RepositoryError> {
        let row = sqlx::query_as::<_, PendingUserRow>(
            r"
            SELECT email, name, phone, address, password_hash,
                   otp_hash, otp_expires_at, otp_attempts
            FROM pending_users
            WHERE email = $1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(PendingUser::try_from).transpose()
    }

    async fn record_failed_attempt(&self, email: &Email) -> Result<i32, RepositoryError> {
        let attempts: Option<i32> = sqlx::query_scalar(
            r"
            UPDATE pending_users
            SET otp_attempts = otp_attempts + 1, updated_at = NOW()
            WHERE email = $1
            RETURNING otp_attempts
            ",
        )
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        attempts.ok_or(RepositoryError::NotFound)
    }

    async fn delete(&self, email: &Email) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM pending_users WHERE email = $1")
            .bind(email.as_str())
            .execute(self.pool)
            .await?;
        Ok(())
    }
}
