//! Cart repository.
//!
//! Carts are written with an optimistic version check: every update is
//! conditional on the version the caller read, and bumps it. A `None`
//! result from [`CartRepository::update`] means another writer got there
//! first and the caller should reload.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;

use mercata_core::{CartId, UserId};

use super::RepositoryError;
use crate::models::{AppliedCoupon, Cart, CartLine};

const CART_COLUMNS: &str = "id, user_id, items, coupons, total_price, version, \
                            created_at, updated_at";

#[derive(sqlx::FromRow)]
struct CartRow {
    id: CartId,
    user_id: UserId,
    items: Json<Vec<CartLine>>,
    coupons: Json<Vec<AppliedCoupon>>,
    total_price: Decimal,
    version: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CartRow> for Cart {
    fn from(row: CartRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            items: row.items.0,
            coupons: row.coupons.0,
            total_price: row.total_price,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The user's cart, if one exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_user(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(&format!(
            "SELECT {CART_COLUMNS} FROM carts WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Cart::from))
    }

    /// Create the user's cart with its first line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user already has a cart
    /// (two concurrent first adds).
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn insert(
        &self,
        user_id: UserId,
        items: &[CartLine],
        total_price: Decimal,
    ) -> Result<Cart, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(&format!(
            "INSERT INTO carts (user_id, items, coupons, total_price) \
             VALUES ($1, $2, '[]'::jsonb, $3) \
             RETURNING {CART_COLUMNS}"
        ))
        .bind(user_id)
        .bind(Json(items))
        .bind(total_price)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "cart already exists for user"))?;

        Ok(Cart::from(row))
    }

    /// Write back a mutated cart, conditional on the version it was read at.
    ///
    /// Returns the stored cart with its bumped version, or `None` if the
    /// version check failed (concurrent writer).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update(&self, cart: &Cart) -> Result<Option<Cart>, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(&format!(
            "UPDATE carts SET \
                 items = $2, \
                 coupons = $3, \
                 total_price = $4, \
                 version = version + 1, \
                 updated_at = NOW() \
             WHERE id = $1 AND version = $5 \
             RETURNING {CART_COLUMNS}"
        ))
        .bind(cart.id)
        .bind(Json(&cart.items))
        .bind(Json(&cart.coupons))
        .bind(cart.total_price)
        .bind(cart.version)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Cart::from))
    }

    /// Drop a cart by ID. Returns `true` if a row was deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: CartId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM carts WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Drop the user's cart. Returns `true` if a row was deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_by_user(&self, user_id: UserId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM carts WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Every cart in the system, newest first (admin).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Cart>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartRow>(&format!(
            "SELECT {CART_COLUMNS} FROM carts ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Cart::from).collect())
    }
}
