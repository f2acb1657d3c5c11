//! Database access for the Mercata API.
//!
//! One repository struct per entity over a shared `PgPool`, each exposing
//! the narrow find/create/update/delete surface its callers need. Embedded
//! document lists (cart lines, applied coupons, coupon entitlements, image
//! and color arrays) live in JSONB columns and round-trip through serde.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p mercata-cli -- migrate
//! ```

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub mod audit_logs;
pub mod brands;
pub mod carts;
pub mod categories;
pub mod coupons;
pub mod otps;
pub mod products;
pub mod push_subscriptions;
pub mod sub_categories;
pub mod users;
pub mod wishlists;

/// Errors surfaced by the repository layer.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A uniqueness or ownership constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The targeted row does not exist.
    #[error("not found")]
    NotFound,

    /// A stored value could not be decoded into its domain type.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

impl RepositoryError {
    /// Map a sqlx error, turning unique violations into `Conflict` with the
    /// given message.
    pub(crate) fn from_unique(err: sqlx::Error, conflict_message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return Self::Conflict(conflict_message.to_owned());
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Pagination window shared by the list queries.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub limit: i64,
    pub skip: i64,
    /// `true` for ascending creation order; newest-first otherwise.
    pub ascending: bool,
}

impl Page {
    /// Largest page a single request may ask for.
    pub const MAX_LIMIT: i64 = 100;

    /// Clamp raw query parameters into a usable window.
    #[must_use]
    pub fn clamped(limit: Option<i64>, skip: Option<i64>, sort: Option<&str>) -> Self {
        Self {
            limit: limit.unwrap_or(10).clamp(1, Self::MAX_LIMIT),
            skip: skip.unwrap_or(0).max(0),
            ascending: sort == Some("asc"),
        }
    }

    /// The SQL `ORDER BY created_at` direction for this window.
    #[must_use]
    pub const fn order(&self) -> &'static str {
        if self.ascending { "ASC" } else { "DESC" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_clamping() {
        let page = Page::clamped(None, None, None);
        assert_eq!(page.limit, 10);
        assert_eq!(page.skip, 0);
        assert!(!page.ascending);

        let page = Page::clamped(Some(5000), Some(-3), Some("asc"));
        assert_eq!(page.limit, Page::MAX_LIMIT);
        assert_eq!(page.skip, 0);
        assert!(page.ascending);
        assert_eq!(page.order(), "ASC");
    }
}
