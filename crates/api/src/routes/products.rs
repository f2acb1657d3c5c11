//! Product route handlers.

use axum::extract::{Path, Query, State};
use axum::{Json, response::IntoResponse};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use mercata_core::slug::{normalize_name, unique_slug};
use mercata_core::{AuditAction, AuditEntity, BrandId, CategoryId, ProductId, SubCategoryId};

use crate::db::brands::BrandRepository;
use crate::db::categories::CategoryRepository;
use crate::db::products::{NewProduct, ProductFilter, ProductPatch, ProductRepository};
use crate::db::sub_categories::SubCategoryRepository;
use crate::error::ApiError;
use crate::middleware::RequireAdmin;
use crate::db::Page;
use crate::response::{ApiResponse, Paginated};
use crate::services::{audit, push};
use crate::state::AppState;

/// Price bounds accepted for a product.
const MIN_PRICE: Decimal = Decimal::ONE;
const MAX_PRICE: Decimal = Decimal::from_parts(20_000, 0, 0, false, 0);

/// List query parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListProductsQuery {
    #[serde(rename = "_limit")]
    pub limit: Option<i64>,
    pub skip: Option<i64>,
    pub sort: Option<String>,
    pub title: Option<String>,
    pub category_id: Option<CategoryId>,
    pub sub_category_id: Option<SubCategoryId>,
    pub brand_id: Option<BrandId>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

/// Create body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductBody {
    pub title: String,
    pub description: String,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    pub image_cover: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub price: Decimal,
    pub price_after_discount: Option<Decimal>,
    #[serde(default)]
    pub colors: Vec<String>,
    pub category_id: CategoryId,
    pub sub_category_id: Option<SubCategoryId>,
    pub brand_id: Option<BrandId>,
}

const fn default_quantity() -> i32 {
    1
}

/// Update body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductBody {
    pub title: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<i32>,
    pub image_cover: Option<String>,
    pub images: Option<Vec<String>>,
    pub price: Option<Decimal>,
    pub price_after_discount: Option<Decimal>,
    pub colors: Option<Vec<String>>,
    pub category_id: Option<CategoryId>,
    pub sub_category_id: Option<SubCategoryId>,
    pub brand_id: Option<BrandId>,
}

fn validate_prices(price: Decimal, discounted: Option<Decimal>) -> Result<(), ApiError> {
    if !(MIN_PRICE..=MAX_PRICE).contains(&price) {
        return Err(ApiError::BadRequest(format!(
            "Price must be between {MIN_PRICE} and {MAX_PRICE}"
        )));
    }
    if let Some(discounted) = discounted
        && discounted > price
    {
        return Err(ApiError::BadRequest(
            "Discounted price cannot exceed the price".to_owned(),
        ));
    }
    Ok(())
}

/// List products.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ListProductsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = ProductRepository::new(state.pool());
    let filter = ProductFilter {
        title: query.title,
        category_id: query.category_id,
        sub_category_id: query.sub_category_id,
        brand_id: query.brand_id,
        min_price: query.min_price,
        max_price: query.max_price,
    };
    let page = Page::clamped(query.limit, query.skip, query.sort.as_deref());
    let (products, total) = repo.list(&filter, page).await?;

    Ok(Paginated::new(
        "Products found successfully",
        products,
        total,
        page,
    ))
}

/// Fetch one product.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = ProductRepository::new(state.pool());
    let product = repo
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".to_owned()))?;

    Ok(ApiResponse::ok("Product found", product))
}

async fn check_references(
    state: &AppState,
    category_id: Option<CategoryId>,
    sub_category_id: Option<SubCategoryId>,
    brand_id: Option<BrandId>,
) -> Result<(), ApiError> {
    if let Some(id) = category_id
        && CategoryRepository::new(state.pool()).get(id).await?.is_none()
    {
        return Err(ApiError::NotFound("Category not found".to_owned()));
    }
    if let Some(id) = sub_category_id
        && SubCategoryRepository::new(state.pool())
            .get(id)
            .await?
            .is_none()
    {
        return Err(ApiError::NotFound("Sub-category not found".to_owned()));
    }
    if let Some(id) = brand_id
        && BrandRepository::new(state.pool()).get(id).await?.is_none()
    {
        return Err(ApiError::NotFound("Brand not found".to_owned()));
    }
    Ok(())
}

/// Admin: create a product.
#[instrument(skip(state, admin, body))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(body): Json<CreateProductBody>,
) -> Result<impl IntoResponse, ApiError> {
    let title = normalize_name(&body.title);
    if title.len() < 3 {
        return Err(ApiError::BadRequest(
            "Title must be at least 3 characters".to_owned(),
        ));
    }
    validate_prices(body.price, body.price_after_discount)?;
    check_references(
        &state,
        Some(body.category_id),
        body.sub_category_id,
        body.brand_id,
    )
    .await?;

    let repo = ProductRepository::new(state.pool());
    if repo.title_exists(&title).await? {
        return Err(ApiError::Conflict("Product already exists".to_owned()));
    }

    let slug = unique_slug(&title, |candidate| {
        let repo = ProductRepository::new(state.pool());
        async move { repo.slug_exists(&candidate).await }
    })
    .await?;

    let product = repo
        .create(&NewProduct {
            title: &title,
            slug: &slug,
            description: &body.description,
            quantity: body.quantity.max(0),
            image_cover: &body.image_cover,
            images: &body.images,
            price: body.price,
            price_after_discount: body.price_after_discount,
            colors: &body.colors,
            category_id: body.category_id,
            sub_category_id: body.sub_category_id,
            brand_id: body.brand_id,
        })
        .await?;

    audit::record(
        state.pool(),
        AuditEntity::Product,
        product.id,
        AuditAction::Create,
        admin.id,
        serde_json::to_value(&product).unwrap_or_default(),
        format!("Product {} created", product.title),
    )
    .await;

    tokio::spawn(push::broadcast_all(
        state.clone(),
        "New Product Available!".to_owned(),
        format!("Check out our new product: {}", product.title),
    ));

    Ok(ApiResponse::created("Product created successfully", product))
}

/// Admin: update a product. A retitle re-runs the slug pipeline.
#[instrument(skip(state, admin, body))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
    Json(body): Json<UpdateProductBody>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = ProductRepository::new(state.pool());
    let existing = repo
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".to_owned()))?;

    let price = body.price.unwrap_or(existing.price);
    let discounted = body
        .price_after_discount
        .or(existing.price_after_discount);
    validate_prices(price, discounted)?;
    check_references(&state, body.category_id, body.sub_category_id, body.brand_id).await?;

    let (title, slug) = match body.title.as_deref() {
        Some(raw) => {
            let title = normalize_name(raw);
            if title.len() < 3 {
                return Err(ApiError::BadRequest(
                    "Title must be at least 3 characters".to_owned(),
                ));
            }
            let slug = unique_slug(&title, |candidate| {
                let repo = ProductRepository::new(state.pool());
                async move { repo.slug_exists(&candidate).await }
            })
            .await?;
            (Some(title), Some(slug))
        }
        None => (None, None),
    };

    let product = repo
        .update(
            id,
            &ProductPatch {
                title: title.as_deref(),
                slug: slug.as_deref(),
                description: body.description.as_deref(),
                quantity: body.quantity,
                image_cover: body.image_cover.as_deref(),
                images: body.images.as_deref(),
                price: body.price,
                price_after_discount: body.price_after_discount,
                colors: body.colors.as_deref(),
                category_id: body.category_id,
                sub_category_id: body.sub_category_id,
                brand_id: body.brand_id,
            },
        )
        .await?;

    audit::record(
        state.pool(),
        AuditEntity::Product,
        product.id,
        AuditAction::Update,
        admin.id,
        serde_json::to_value(&product).unwrap_or_default(),
        format!("Product {} updated", product.title),
    )
    .await;

    Ok(ApiResponse::ok("Product updated successfully", product))
}

/// Admin: delete a product.
#[instrument(skip(state, admin))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = ProductRepository::new(state.pool());
    if !repo.delete(id).await? {
        return Err(ApiError::NotFound("Product not found".to_owned()));
    }

    audit::record(
        state.pool(),
        AuditEntity::Product,
        id,
        AuditAction::Delete,
        admin.id,
        serde_json::Value::Null,
        format!("Product {id} deleted"),
    )
    .await;

    Ok(ApiResponse::<()>::empty("Product deleted successfully"))
}
