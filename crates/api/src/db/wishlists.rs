//! Wishlist repository.

use sqlx::PgPool;

use mercata_core::{ProductId, UserId};

use super::RepositoryError;
use crate::models::WishlistEntry;

const WISHLIST_COLUMNS: &str = "id, user_id, product_id, created_at";

/// Repository for wishlist database operations.
pub struct WishlistRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WishlistRepository<'a> {
    /// Create a new wishlist repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The user's saved products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<WishlistEntry>, RepositoryError> {
        let entries = sqlx::query_as::<_, WishlistEntry>(&format!(
            "SELECT {WISHLIST_COLUMNS} FROM wishlists \
             WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(entries)
    }

    /// The user's entry for a specific product, if saved.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<WishlistEntry>, RepositoryError> {
        let entry = sqlx::query_as::<_, WishlistEntry>(&format!(
            "SELECT {WISHLIST_COLUMNS} FROM wishlists \
             WHERE user_id = $1 AND product_id = $2"
        ))
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(entry)
    }

    /// Save a product for a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the product is already saved.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn add(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<WishlistEntry, RepositoryError> {
        let entry = sqlx::query_as::<_, WishlistEntry>(&format!(
            "INSERT INTO wishlists (user_id, product_id) VALUES ($1, $2) \
             RETURNING {WISHLIST_COLUMNS}"
        ))
        .bind(user_id)
        .bind(product_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "product already in wishlist"))?;

        Ok(entry)
    }

    /// Remove a saved product. Returns `true` if a row was deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM wishlists WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
