//! Push subscription repository.

use sqlx::PgPool;

use mercata_core::{SubscriptionId, UserId};

use super::RepositoryError;
use crate::models::PushSubscription;

const SUBSCRIPTION_COLUMNS: &str = "id, user_id, endpoint, p256dh, auth, created_at";

/// Repository for push subscription database operations.
pub struct PushSubscriptionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PushSubscriptionRepository<'a> {
    /// Create a new push subscription repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Register a subscription, replacing the keys if the endpoint is
    /// already known (re-subscribe from the same browser).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(
        &self,
        user_id: UserId,
        endpoint: &str,
        p256dh: &str,
        auth: &str,
    ) -> Result<PushSubscription, RepositoryError> {
        let subscription = sqlx::query_as::<_, PushSubscription>(&format!(
            "INSERT INTO push_subscriptions (user_id, endpoint, p256dh, auth) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (endpoint) DO UPDATE \
                 SET user_id = EXCLUDED.user_id, \
                     p256dh = EXCLUDED.p256dh, \
                     auth = EXCLUDED.auth \
             RETURNING {SUBSCRIPTION_COLUMNS}"
        ))
        .bind(user_id)
        .bind(endpoint)
        .bind(p256dh)
        .bind(auth)
        .fetch_one(self.pool)
        .await?;

        Ok(subscription)
    }

    /// Remove a subscription by endpoint. Returns `true` if a row was
    /// deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_by_endpoint(&self, endpoint: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM push_subscriptions WHERE endpoint = $1")
            .bind(endpoint)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove a batch of dead subscriptions.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_many(&self, ids: &[SubscriptionId]) -> Result<(), RepositoryError> {
        let raw: Vec<i32> = ids.iter().map(|id| id.as_i32()).collect();
        sqlx::query("DELETE FROM push_subscriptions WHERE id = ANY($1)")
            .bind(&raw)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// Every registered subscription.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<PushSubscription>, RepositoryError> {
        let subscriptions = sqlx::query_as::<_, PushSubscription>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM push_subscriptions"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(subscriptions)
    }

    /// Subscriptions belonging to a set of users.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_users(
        &self,
        user_ids: &[UserId],
    ) -> Result<Vec<PushSubscription>, RepositoryError> {
        let raw: Vec<i32> = user_ids.iter().map(|id| id.as_i32()).collect();
        let subscriptions = sqlx::query_as::<_, PushSubscription>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM push_subscriptions WHERE user_id = ANY($1)"
        ))
        .bind(&raw)
        .fetch_all(self.pool)
        .await?;

        Ok(subscriptions)
    }
}
