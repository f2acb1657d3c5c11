//! Wishlist route handlers.

use axum::extract::{Path, State};
use axum::{Json, response::IntoResponse};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use mercata_core::ProductId;

use crate::db::products::ProductRepository;
use crate::db::wishlists::WishlistRepository;
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::models::WishlistEntry;
use crate::response::ApiResponse;
use crate::routes::cart::ProductSummary;
use crate::state::AppState;

/// Add-to-wishlist request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToWishlistBody {
    pub product_id: ProductId,
}

/// A wishlist entry with its product resolved.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistEntryView {
    pub product_id: ProductId,
    /// Absent when the product has since been deleted.
    pub product: Option<ProductSummary>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Save a product to the caller's wishlist.
#[instrument(skip(state, user))]
pub async fn add(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<AddToWishlistBody>,
) -> Result<impl IntoResponse, ApiError> {
    let products = ProductRepository::new(state.pool());
    if products.get(body.product_id).await?.is_none() {
        return Err(ApiError::NotFound("Product not found".to_owned()));
    }

    let repo = WishlistRepository::new(state.pool());
    let entry = repo
        .add(user.id, body.product_id)
        .await
        .map_err(|e| match e {
            crate::db::RepositoryError::Conflict(_) => {
                ApiError::Conflict("Product already exists in wishlist".to_owned())
            }
            other => other.into(),
        })?;

    Ok(ApiResponse::created(
        "Product added to wishlist successfully",
        entry,
    ))
}

/// The caller's wishlist with products resolved.
#[instrument(skip(state, user))]
pub async fn index(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let repo = WishlistRepository::new(state.pool());
    let entries: Vec<WishlistEntry> = repo.list_by_user(user.id).await?;

    let ids: Vec<ProductId> = entries.iter().map(|e| e.product_id).collect();
    let products = ProductRepository::new(state.pool()).get_many(&ids).await?;

    let views: Vec<WishlistEntryView> = entries
        .into_iter()
        .map(|entry| WishlistEntryView {
            product_id: entry.product_id,
            product: products
                .iter()
                .find(|p| p.id == entry.product_id)
                .map(ProductSummary::from),
            created_at: entry.created_at,
        })
        .collect();

    Ok(ApiResponse::ok("Wishlist products found", views))
}

/// Remove a product from the caller's wishlist.
#[instrument(skip(state, user))]
pub async fn remove(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(product_id): Path<ProductId>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = WishlistRepository::new(state.pool());
    if !repo.remove(user.id, product_id).await? {
        return Err(ApiError::NotFound("Wishlist product not found".to_owned()));
    }

    Ok(ApiResponse::<()>::empty(
        "Product removed from wishlist successfully",
    ))
}
