//! Product repository.

use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgPool, QueryBuilder};

use mercata_core::{BrandId, CategoryId, ProductId, SubCategoryId};

use super::{Page, RepositoryError};
use crate::models::Product;
use crate::pricing::ProductPricing;

const PRODUCT_COLUMNS: &str = "id, title, slug, description, quantity, image_cover, images, \
                               sold, price, price_after_discount, colors, category_id, \
                               sub_category_id, brand_id, ratings_average, ratings_quantity, \
                               created_at, updated_at";

/// Raw row shape; JSONB array columns unwrap into the model.
#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    title: String,
    slug: String,
    description: String,
    quantity: i32,
    image_cover: String,
    images: Json<Vec<String>>,
    sold: i32,
    price: Decimal,
    price_after_discount: Option<Decimal>,
    colors: Json<Vec<String>>,
    category_id: CategoryId,
    sub_category_id: Option<SubCategoryId>,
    brand_id: Option<BrandId>,
    ratings_average: Decimal,
    ratings_quantity: i32,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            slug: row.slug,
            description: row.description,
            quantity: row.quantity,
            image_cover: row.image_cover,
            images: row.images.0,
            sold: row.sold,
            price: row.price,
            price_after_discount: row.price_after_discount,
            colors: row.colors.0,
            category_id: row.category_id,
            sub_category_id: row.sub_category_id,
            brand_id: row.brand_id,
            ratings_average: row.ratings_average,
            ratings_quantity: row.ratings_quantity,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Fields for a new product row.
#[derive(Debug)]
pub struct NewProduct<'a> {
    pub title: &'a str,
    pub slug: &'a str,
    pub description: &'a str,
    pub quantity: i32,
    pub image_cover: &'a str,
    pub images: &'a [String],
    pub price: Decimal,
    pub price_after_discount: Option<Decimal>,
    pub colors: &'a [String],
    pub category_id: CategoryId,
    pub sub_category_id: Option<SubCategoryId>,
    pub brand_id: Option<BrandId>,
}

/// Optional field updates for an existing product.
#[derive(Debug, Default)]
pub struct ProductPatch<'a> {
    pub title: Option<&'a str>,
    pub slug: Option<&'a str>,
    pub description: Option<&'a str>,
    pub quantity: Option<i32>,
    pub image_cover: Option<&'a str>,
    pub images: Option<&'a [String]>,
    pub price: Option<Decimal>,
    /// Set to zero to clear a promotion.
    pub price_after_discount: Option<Decimal>,
    pub colors: Option<&'a [String]>,
    pub category_id: Option<CategoryId>,
    pub sub_category_id: Option<SubCategoryId>,
    pub brand_id: Option<BrandId>,
}

/// Filters for the product listing.
#[derive(Debug, Default)]
pub struct ProductFilter {
    pub title: Option<String>,
    pub category_id: Option<CategoryId>,
    pub sub_category_id: Option<SubCategoryId>,
    pub brand_id: Option<BrandId>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// Whether a product already uses `title` (titles are stored normalized).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn title_exists(&self, title: &str) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM products WHERE title = $1)")
                .bind(title)
                .fetch_one(self.pool)
                .await?;

        Ok(exists)
    }

    /// Whether a product already uses `slug`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn slug_exists(&self, slug: &str) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM products WHERE slug = $1)")
                .bind(slug)
                .fetch_one(self.pool)
                .await?;

        Ok(exists)
    }

    /// Insert a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the title or slug is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, new: &NewProduct<'_>) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "INSERT INTO products (title, slug, description, quantity, image_cover, images, \
                                   price, price_after_discount, colors, category_id, \
                                   sub_category_id, brand_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(new.title)
        .bind(new.slug)
        .bind(new.description)
        .bind(new.quantity)
        .bind(new.image_cover)
        .bind(Json(new.images))
        .bind(new.price)
        .bind(new.price_after_discount)
        .bind(Json(new.colors))
        .bind(new.category_id)
        .bind(new.sub_category_id)
        .bind(new.brand_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "product already exists"))?;

        Ok(Product::from(row))
    }

    /// Update a product; absent fields keep their stored values.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    /// Returns `RepositoryError::Conflict` if the new title or slug is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(
        &self,
        id: ProductId,
        patch: &ProductPatch<'_>,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "UPDATE products SET \
                 title = COALESCE($2, title), \
                 slug = COALESCE($3, slug), \
                 description = COALESCE($4, description), \
                 quantity = COALESCE($5, quantity), \
                 image_cover = COALESCE($6, image_cover), \
                 images = COALESCE($7, images), \
                 price = COALESCE($8, price), \
                 price_after_discount = COALESCE($9, price_after_discount), \
                 colors = COALESCE($10, colors), \
                 category_id = COALESCE($11, category_id), \
                 sub_category_id = COALESCE($12, sub_category_id), \
                 brand_id = COALESCE($13, brand_id), \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .bind(patch.title)
        .bind(patch.slug)
        .bind(patch.description)
        .bind(patch.quantity)
        .bind(patch.image_cover)
        .bind(patch.images.map(Json))
        .bind(patch.price)
        .bind(patch.price_after_discount)
        .bind(patch.colors.map(Json))
        .bind(patch.category_id)
        .bind(patch.sub_category_id)
        .bind(patch.brand_id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "product already exists"))?
        .ok_or(RepositoryError::NotFound)?;

        Ok(Product::from(row))
    }

    /// Delete a product. Returns `true` if a row was deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// The pricing slice of one product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn pricing(&self, id: ProductId) -> Result<Option<ProductPricing>, RepositoryError> {
        let row = sqlx::query_as::<_, (ProductId, Decimal, Option<Decimal>, i32)>(
            "SELECT id, price, price_after_discount, quantity FROM products WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|(id, price, price_after_discount, quantity)| ProductPricing {
            id,
            price,
            price_after_discount,
            quantity,
        }))
    }

    /// The pricing slices of several products at once.
    ///
    /// Missing IDs are silently absent from the result.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn pricing_many(
        &self,
        ids: &[ProductId],
    ) -> Result<Vec<ProductPricing>, RepositoryError> {
        let raw: Vec<i32> = ids.iter().map(|id| id.as_i32()).collect();
        let rows = sqlx::query_as::<_, (ProductId, Decimal, Option<Decimal>, i32)>(
            "SELECT id, price, price_after_discount, quantity FROM products WHERE id = ANY($1)",
        )
        .bind(&raw)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, price, price_after_discount, quantity)| ProductPricing {
                id,
                price,
                price_after_discount,
                quantity,
            })
            .collect())
    }

    /// Fetch full products for a set of IDs (read-side joins).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let raw: Vec<i32> = ids.iter().map(|id| id.as_i32()).collect();
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"
        ))
        .bind(&raw)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// List products with catalog filters.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        filter: &ProductFilter,
        page: Page,
    ) -> Result<(Vec<Product>, i64), RepositoryError> {
        let mut query =
            QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE TRUE"));
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM products WHERE TRUE");

        if let Some(title) = &filter.title {
            let pattern = format!("%{title}%");
            query.push(" AND title ILIKE ").push_bind(pattern.clone());
            count.push(" AND title ILIKE ").push_bind(pattern);
        }
        if let Some(category_id) = filter.category_id {
            query.push(" AND category_id = ").push_bind(category_id);
            count.push(" AND category_id = ").push_bind(category_id);
        }
        if let Some(sub_category_id) = filter.sub_category_id {
            query.push(" AND sub_category_id = ").push_bind(sub_category_id);
            count.push(" AND sub_category_id = ").push_bind(sub_category_id);
        }
        if let Some(brand_id) = filter.brand_id {
            query.push(" AND brand_id = ").push_bind(brand_id);
            count.push(" AND brand_id = ").push_bind(brand_id);
        }
        if let Some(min_price) = filter.min_price {
            query.push(" AND price >= ").push_bind(min_price);
            count.push(" AND price >= ").push_bind(min_price);
        }
        if let Some(max_price) = filter.max_price {
            query.push(" AND price <= ").push_bind(max_price);
            count.push(" AND price <= ").push_bind(max_price);
        }

        query
            .push(format!(" ORDER BY created_at {}", page.order()))
            .push(" LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.skip);

        let rows = query
            .build_query_as::<ProductRow>()
            .fetch_all(self.pool)
            .await?;
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        Ok((rows.into_iter().map(Product::from).collect(), total))
    }
}
