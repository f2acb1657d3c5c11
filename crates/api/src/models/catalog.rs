//! Catalog models: category, sub-category, brand, product.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use mercata_core::{BrandId, CategoryId, ProductId, SubCategoryId};

/// Top-level catalog grouping.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Second-level grouping under a [`Category`].
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SubCategory {
    pub id: SubCategoryId,
    pub name: String,
    pub slug: String,
    pub category_id: CategoryId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Brand {
    pub id: BrandId,
    pub name: String,
    pub slug: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A sellable product.
///
/// `price_after_discount` is the promotional price; pricing uses it instead
/// of `price` whenever it is present and positive.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub slug: String,
    pub description: String,
    /// Units in stock. Zero means the product cannot be added to a cart.
    pub quantity: i32,
    pub image_cover: String,
    pub images: Vec<String>,
    pub sold: i32,
    pub price: Decimal,
    pub price_after_discount: Option<Decimal>,
    pub colors: Vec<String>,
    pub category_id: CategoryId,
    pub sub_category_id: Option<SubCategoryId>,
    pub brand_id: Option<BrandId>,
    pub ratings_average: Decimal,
    pub ratings_quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
