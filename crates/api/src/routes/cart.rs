//! Cart route handlers.
//!
//! Mutations run through `services::cart::CartService`; responses resolve
//! line product references into display summaries here, on the read side,
//! instead of leaning on storage-level population.

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::{Json, response::IntoResponse};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use mercata_core::{CouponId, ProductId, UserId};

use crate::db::carts::CartRepository;
use crate::db::coupons::CouponRepository;
use crate::db::products::ProductRepository;
use crate::db::users::UserRepository;
use crate::error::ApiError;
use crate::middleware::{CurrentUser, RequireAdmin};
use crate::models::{Cart, Coupon, Product, coupon::is_valid_code};
use crate::response::ApiResponse;
use crate::services::cart::CartService;
use crate::state::AppState;

/// Add-to-cart request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartBody {
    pub product_id: ProductId,
}

/// Update-line request body. `count` is the new quantity.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartBody {
    pub product_id: ProductId,
    pub color: Option<String>,
    pub count: Option<i32>,
}

/// Apply-coupon request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyCouponBody {
    pub coupon_code: String,
}

/// Product display data embedded in cart responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: ProductId,
    pub title: String,
    pub price: Decimal,
    pub price_after_discount: Option<Decimal>,
    pub image_cover: String,
}

impl From<&Product> for ProductSummary {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            title: product.title.clone(),
            price: product.price,
            price_after_discount: product.price_after_discount,
            image_cover: product.image_cover.clone(),
        }
    }
}

/// One cart line with its product resolved.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineView {
    pub product_id: ProductId,
    /// Absent when the product has since been deleted.
    pub product: Option<ProductSummary>,
    pub quantity: i32,
    pub color: String,
}

/// A cart ready for display.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub id: mercata_core::CartId,
    pub cart_items: Vec<CartLineView>,
    pub coupons: Vec<crate::models::AppliedCoupon>,
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Coupon display data for admin cart responses.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponSummary {
    pub id: CouponId,
    pub coupon_code: String,
    pub coupon_type: mercata_core::CouponType,
    pub coupon_amount: Decimal,
    pub is_enable: bool,
}

impl From<&Coupon> for CouponSummary {
    fn from(coupon: &Coupon) -> Self {
        Self {
            id: coupon.id,
            coupon_code: coupon.coupon_code.clone(),
            coupon_type: coupon.coupon_type,
            coupon_amount: coupon.coupon_amount,
            is_enable: coupon.is_enable,
        }
    }
}

/// Owner display data for admin cart responses.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartOwnerView {
    pub id: UserId,
    pub name: Option<String>,
    pub email: String,
}

/// Admin view: a cart with owner and coupon details resolved.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminCartView {
    pub user: Option<CartOwnerView>,
    #[serde(flatten)]
    pub cart: CartView,
    pub coupon_details: Vec<CouponSummary>,
}

fn service(state: &AppState) -> CartService<CartRepository<'_>, ProductRepository<'_>, CouponRepository<'_>> {
    CartService::new(
        CartRepository::new(state.pool()),
        ProductRepository::new(state.pool()),
        CouponRepository::new(state.pool()),
    )
}

/// Resolve a cart's product references for display.
async fn resolve_view(state: &AppState, cart: Cart) -> Result<CartView, ApiError> {
    let ids: Vec<ProductId> = cart.items.iter().map(|l| l.product_id).collect();
    let products = ProductRepository::new(state.pool()).get_many(&ids).await?;
    let by_id: HashMap<ProductId, ProductSummary> = products
        .iter()
        .map(|p| (p.id, ProductSummary::from(p)))
        .collect();

    let cart_items = cart
        .items
        .iter()
        .map(|line| CartLineView {
            product_id: line.product_id,
            product: by_id.get(&line.product_id).cloned(),
            quantity: line.quantity,
            color: line.color.clone(),
        })
        .collect();

    Ok(CartView {
        id: cart.id,
        cart_items,
        coupons: cart.coupons,
        total_price: cart.total_price,
        created_at: cart.created_at,
        updated_at: cart.updated_at,
    })
}

/// Resolve the admin view: owner, products, and coupon details.
async fn resolve_admin_view(state: &AppState, cart: Cart) -> Result<AdminCartView, ApiError> {
    let users = UserRepository::new(state.pool());
    let owner = users.get_by_id(cart.user_id).await?.map(|u| CartOwnerView {
        id: u.id,
        name: u.name,
        email: u.email.to_string(),
    });

    let coupons = CouponRepository::new(state.pool());
    let mut coupon_details = Vec::with_capacity(cart.coupons.len());
    for applied in &cart.coupons {
        if let Some(coupon) = coupons.get(applied.coupon_id).await? {
            coupon_details.push(CouponSummary::from(&coupon));
        }
    }

    let cart = resolve_view(state, cart).await?;

    Ok(AdminCartView {
        user: owner,
        cart,
        coupon_details,
    })
}

/// Add a product to the caller's cart.
#[instrument(skip(state, user))]
pub async fn add(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<AddToCartBody>,
) -> Result<impl IntoResponse, ApiError> {
    let cart = service(&state).add_line(user.id, body.product_id).await?;
    let view = resolve_view(&state, cart).await?;

    Ok(ApiResponse::created("Product added to cart successfully", view))
}

/// Update a line's color and/or quantity.
#[instrument(skip(state, user))]
pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<UpdateCartBody>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(count) = body.count
        && count < 1
    {
        return Err(ApiError::BadRequest(
            "Count must be at least 1".to_owned(),
        ));
    }

    let cart = service(&state)
        .update_line(user.id, body.product_id, body.color.as_deref(), body.count)
        .await?;
    let view = resolve_view(&state, cart).await?;

    Ok(ApiResponse::ok("Cart updated successfully", view))
}

/// Apply a coupon code to the caller's cart.
#[instrument(skip(state, user, body))]
pub async fn apply_coupon(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<ApplyCouponBody>,
) -> Result<impl IntoResponse, ApiError> {
    if !is_valid_code(&body.coupon_code) {
        return Err(ApiError::BadRequest(
            "Coupon code must be exactly 6 digits".to_owned(),
        ));
    }

    let cart = service(&state)
        .apply_coupon(user.id, &body.coupon_code, Utc::now())
        .await?;
    let view = resolve_view(&state, cart).await?;

    Ok(ApiResponse::ok("Coupon applied successfully", view))
}

/// Fetch the caller's cart.
#[instrument(skip(state, user))]
pub async fn show(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let cart = service(&state).get(user.id).await?;
    let view = resolve_view(&state, cart).await?;

    Ok(ApiResponse::ok("User cart found successfully", view))
}

/// Remove one line; deletes the cart when the last line goes.
#[instrument(skip(state, user))]
pub async fn remove(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(product_id): Path<ProductId>,
) -> Result<impl IntoResponse, ApiError> {
    match service(&state).remove_line(user.id, product_id).await? {
        Some(cart) => {
            let view = resolve_view(&state, cart).await?;
            Ok(ApiResponse::ok("Product removed from cart successfully", view).into_response())
        }
        None => Ok(ApiResponse::<()>::empty("Cart is empty now").into_response()),
    }
}

/// Clear the caller's cart.
#[instrument(skip(state, user))]
pub async fn clear(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    service(&state).clear(user.id).await?;

    Ok(ApiResponse::<()>::empty("Cart cleared successfully"))
}

/// Admin: every cart in the system, fully resolved.
#[instrument(skip(state, _admin))]
pub async fn admin_index(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<impl IntoResponse, ApiError> {
    let carts = CartRepository::new(state.pool()).list_all().await?;
    if carts.is_empty() {
        return Err(ApiError::NotFound("No carts found".to_owned()));
    }

    let mut views = Vec::with_capacity(carts.len());
    for cart in carts {
        views.push(resolve_admin_view(&state, cart).await?);
    }

    Ok(ApiResponse::ok("Carts fetched successfully", views))
}

/// Admin: one user's cart, fully resolved.
#[instrument(skip(state, _admin))]
pub async fn admin_show(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(user_id): Path<UserId>,
) -> Result<impl IntoResponse, ApiError> {
    let cart = CartRepository::new(state.pool())
        .find_by_user(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Cart not found for this user".to_owned()))?;

    let view = resolve_admin_view(&state, cart).await?;

    Ok(ApiResponse::ok("Cart fetched successfully", view))
}
