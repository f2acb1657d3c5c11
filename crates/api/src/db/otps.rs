//! Password-reset code repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use mercata_core::{Email, OtpId};

use super::RepositoryError;
use crate::models::Otp;

const OTP_COLUMNS: &str = "id, email, code, expires_at, created_at";

/// Repository for password-reset codes.
pub struct OtpRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OtpRepository<'a> {
    /// Create a new OTP repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a fresh code for `email`, dropping any previous one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn replace(
        &self,
        email: &Email,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Otp, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM otps WHERE email = $1")
            .bind(email)
            .execute(&mut *tx)
            .await?;

        let otp = sqlx::query_as::<_, Otp>(&format!(
            "INSERT INTO otps (email, code, expires_at) VALUES ($1, $2, $3) \
             RETURNING {OTP_COLUMNS}"
        ))
        .bind(email)
        .bind(code)
        .bind(expires_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(otp)
    }

    /// The unexpired code stored for `email` and `code`, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_valid(
        &self,
        email: &Email,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Otp>, RepositoryError> {
        let otp = sqlx::query_as::<_, Otp>(&format!(
            "SELECT {OTP_COLUMNS} FROM otps \
             WHERE email = $1 AND code = $2 AND expires_at > $3"
        ))
        .bind(email)
        .bind(code)
        .bind(now)
        .fetch_optional(self.pool)
        .await?;

        Ok(otp)
    }

    /// Consume a code after a successful reset.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: OtpId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM otps WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// Purge every expired code; returns how many were dropped.
    ///
    /// Run periodically by the background sweeper.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM otps WHERE expires_at <= $1")
            .bind(now)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
