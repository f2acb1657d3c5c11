//! Category repository.

use sqlx::{PgPool, QueryBuilder};

use mercata_core::CategoryId;

use super::{Page, RepositoryError};
use crate::models::Category;

const CATEGORY_COLUMNS: &str = "id, name, slug, image, created_at, updated_at";

/// Repository for category database operations.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    /// Create a new category repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a category by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(category)
    }

    /// Whether a category already uses `name` (names are stored normalized).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn name_exists(&self, name: &str) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM categories WHERE name = $1)")
                .bind(name)
                .fetch_one(self.pool)
                .await?;

        Ok(exists)
    }

    /// Whether a category already uses `slug`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn slug_exists(&self, slug: &str) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM categories WHERE slug = $1)")
                .bind(slug)
                .fetch_one(self.pool)
                .await?;

        Ok(exists)
    }

    /// Insert a category.
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
    ) -> Result<Category, RepositoryError> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "INSERT INTO categories (name, slug, image) VALUES ($1, $2, $3) \
             RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(name)
        .bind(slug)
        .bind(image)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "category already exists"))?;

        Ok(category)
    }

    /// Update a category; absent fields keep their stored values.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category doesn't exist.
    /// Returns `RepositoryError::Conflict` if the new name or slug is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(
        &self,
        id: CategoryId,
        name: Option<&str>,
        slug: Option<&str>,
        image: Option<&str>,
    ) -> Result<Category, RepositoryError> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "UPDATE categories SET \
                 name = COALESCE($2, name), \
                 slug = COALESCE($3, slug), \
                 image = COALESCE($4, image), \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(id)
        .bind(name)
        .bind(slug)
        .bind(image)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "category already exists"))?
        .ok_or(RepositoryError::NotFound)?;

        Ok(category)
    }

    /// Delete a category and its sub-categories.
    ///
    /// Returns `true` if the category row was deleted. The sub-category
    /// cascade is handled by the schema's foreign key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: CategoryId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// How many products still reference this category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn product_count(&self, id: CategoryId) -> Result<i64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE category_id = $1")
                .bind(id)
                .fetch_one(self.pool)
                .await?;

        Ok(count)
    }

    /// List categories with an optional name filter.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        name: Option<&str>,
        page: Page,
    ) -> Result<(Vec<Category>, i64), RepositoryError> {
        let mut query =
            QueryBuilder::new(format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE TRUE"));
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM categories WHERE TRUE");

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

        let categories = query
            .build_query_as::<Category>()
            .fetch_all(self.pool)
            .await?;
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        Ok((categories, total))
    }
}
