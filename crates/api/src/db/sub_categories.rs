//! Sub-category repository.

use sqlx::{PgPool, QueryBuilder};

use mercata_core::{CategoryId, SubCategoryId};

use super::{Page, RepositoryError};
use crate::models::SubCategory;

const SUB_CATEGORY_COLUMNS: &str = "id, name, slug, category_id, created_at, updated_at";

/// Repository for sub-category database operations.
pub struct SubCategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SubCategoryRepository<'a> {
    /// Create a new sub-category repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a sub-category by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: SubCategoryId) -> Result<Option<SubCategory>, RepositoryError> {
        let sub_category = sqlx::query_as::<_, SubCategory>(&format!(
            "SELECT {SUB_CATEGORY_COLUMNS} FROM sub_categories WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(sub_category)
    }

    /// Whether a sub-category already uses `name` under the same category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn name_exists(
        &self,
        category_id: CategoryId,
        name: &str,
    ) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM sub_categories WHERE category_id = $1 AND name = $2)",
        )
        .bind(category_id)
        .bind(name)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    /// Whether a sub-category already uses `slug`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn slug_exists(&self, slug: &str) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM sub_categories WHERE slug = $1)")
                .bind(slug)
                .fetch_one(self.pool)
                .await?;

        Ok(exists)
    }

    /// Insert a sub-category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        name: &str,
        slug: &str,
        category_id: CategoryId,
    ) -> Result<SubCategory, RepositoryError> {
        let sub_category = sqlx::query_as::<_, SubCategory>(&format!(
            "INSERT INTO sub_categories (name, slug, category_id) VALUES ($1, $2, $3) \
             RETURNING {SUB_CATEGORY_COLUMNS}"
        ))
        .bind(name)
        .bind(slug)
        .bind(category_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "sub-category already exists"))?;

        Ok(sub_category)
    }

    /// Update a sub-category; absent fields keep their stored values.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the sub-category doesn't exist.
    /// Returns `RepositoryError::Conflict` if the new slug is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(
        &self,
        id: SubCategoryId,
        name: Option<&str>,
        slug: Option<&str>,
        category_id: Option<CategoryId>,
    ) -> Result<SubCategory, RepositoryError> {
        let sub_category = sqlx::query_as::<_, SubCategory>(&format!(
            "UPDATE sub_categories SET \
                 name = COALESCE($2, name), \
                 slug = COALESCE($3, slug), \
                 category_id = COALESCE($4, category_id), \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {SUB_CATEGORY_COLUMNS}"
        ))
        .bind(id)
        .bind(name)
        .bind(slug)
        .bind(category_id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "sub-category already exists"))?
        .ok_or(RepositoryError::NotFound)?;

        Ok(sub_category)
    }

    /// Delete a sub-category. Returns `true` if a row was deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: SubCategoryId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM sub_categories WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// List sub-categories, optionally restricted to one category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        category_id: Option<CategoryId>,
        name: Option<&str>,
        page: Page,
    ) -> Result<(Vec<SubCategory>, i64), RepositoryError> {
        let mut query = QueryBuilder::new(format!(
            "SELECT {SUB_CATEGORY_COLUMNS} FROM sub_categories WHERE TRUE"
        ));
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM sub_categories WHERE TRUE");

        if let Some(category_id) = category_id {
            query.push(" AND category_id = ").push_bind(category_id);
            count.push(" AND category_id = ").push_bind(category_id);
        }
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

        let sub_categories = query
            .build_query_as::<SubCategory>()
            .fetch_all(self.pool)
            .await?;
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        Ok((sub_categories, total))
    }
}
