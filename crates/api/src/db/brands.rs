//! Brand repository.

use sqlx::{PgPool, QueryBuilder};

use mercata_core::BrandId;

use super::{Page, RepositoryError};
use crate::models::Brand;

const BRAND_COLUMNS: &str = "id, name, slug, image, created_at, updated_at";

/// Repository for brand database operations.
pub struct BrandRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BrandRepository<'a> {
    /// Create a new brand repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a brand by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: BrandId) -> Result<Option<Brand>, RepositoryError> {
        let brand = sqlx::query_as::<_, Brand>(&format!(
            "SELECT {BRAND_COLUMNS} FROM brands WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(brand)
    }

    /// Whether a brand already uses `name` (names are stored normalized).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn name_exists(&self, name: &str) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM brands WHERE name = $1)")
                .bind(name)
                .fetch_one(self.pool)
                .await?;

        Ok(exists)
    }

    /// Whether a brand already uses `slug`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn slug_exists(&self, slug: &str) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM brands WHERE slug = $1)")
                .bind(slug)
                .fetch_one(self.pool)
                .await?;

        Ok(exists)
    }

    /// Insert a brand.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name or slug is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        name: &str,
        slug: &str,
        image: Option<&str>,
    ) -> Result<Brand, RepositoryError> {
        let brand = sqlx::query_as::<_, Brand>(&format!(
            "INSERT INTO brands (name, slug, image) VALUES ($1, $2, $3) \
             RETURNING {BRAND_COLUMNS}"
        ))
        .bind(name)
        .bind(slug)
        .bind(image)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "brand already exists"))?;

        Ok(brand)
    }

    /// Update a brand; absent fields keep their stored values.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the brand doesn't exist.
    /// Returns `RepositoryError::Conflict` if the new name or slug is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(
        &self,
        id: BrandId,
        name: Option<&str>,
        slug: Option<&str>,
        image: Option<&str>,
    ) -> Result<Brand, RepositoryError> {
        let brand = sqlx::query_as::<_, Brand>(&format!(
            "UPDATE brands SET \
                 name = COALESCE($2, name), \
                 slug = COALESCE($3, slug), \
                 image = COALESCE($4, image), \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {BRAND_COLUMNS}"
        ))
        .bind(id)
        .bind(name)
        .bind(slug)
        .bind(image)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "brand already exists"))?
        .ok_or(RepositoryError::NotFound)?;

        Ok(brand)
    }

    /// Delete a brand. Returns `true` if a row was deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: BrandId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM brands WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// List brands with an optional name filter.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        name: Option<&str>,
        page: Page,
    ) -> Result<(Vec<Brand>, i64), RepositoryError> {
        let mut query =
            QueryBuilder::new(format!("SELECT {BRAND_COLUMNS} FROM brands WHERE TRUE"));
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM brands WHERE TRUE");

        if let Some(name) = name {
            let pattern = format!("%{name}%");
            query.push(" AND name ILIKE ").push_bind(pattern.clone());
            count.push(" AND name ILIKE ").push_bind(pattern);
        }

        query
            .push(format!(" ORDER BY created_at {}", page.order()))
            .push(" LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.skip);

        let brands = query.build_query_as::<Brand>().fetch_all(self.pool).await?;
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        Ok((brands, total))
    }
}
