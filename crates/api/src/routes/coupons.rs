//! Coupon route handlers (admin only).

use axum::extract::{Path, Query, State};
use axum::{Json, response::IntoResponse};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use mercata_core::{AuditAction, AuditEntity, CouponId, CouponType, UserId};

use crate::db::coupons::{CouponPatch, CouponRepository, NewCoupon};
use crate::db::users::UserRepository;
use crate::error::ApiError;
use crate::middleware::RequireAdmin;
use crate::models::{UserEntitlement, coupon::is_valid_code};
use crate::db::Page;
use crate::response::{ApiResponse, Paginated};
use crate::services::{audit, push};
use crate::state::AppState;

/// List query parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCouponsQuery {
    #[serde(rename = "_limit")]
    pub limit: Option<i64>,
    pub skip: Option<i64>,
    pub sort: Option<String>,
    pub is_enable: Option<bool>,
}

/// Create body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCouponBody {
    pub coupon_code: String,
    pub coupon_amount: Decimal,
    pub coupon_type: CouponType,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default = "default_enabled")]
    pub is_enable: bool,
    #[serde(default)]
    pub users: Vec<UserEntitlement>,
}

const fn default_enabled() -> bool {
    true
}

/// Update body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCouponBody {
    pub coupon_amount: Option<Decimal>,
    pub coupon_type: Option<CouponType>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_enable: Option<bool>,
    pub users: Option<Vec<UserEntitlement>>,
}

async fn validate_entitled_users(
    state: &AppState,
    users: &[UserEntitlement],
) -> Result<(), ApiError> {
    if users.is_empty() {
        return Ok(());
    }

    let ids: Vec<UserId> = users.iter().map(|e| e.user_id).collect();
    let repo = UserRepository::new(state.pool());
    if !repo.all_exist(&ids).await? {
        return Err(ApiError::BadRequest(
            "Some user IDs are invalid or do not exist".to_owned(),
        ));
    }

    Ok(())
}

/// Admin: list coupons.
#[instrument(skip(state, _admin))]
pub async fn index(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Query(query): Query<ListCouponsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = CouponRepository::new(state.pool());
    let page = Page::clamped(query.limit, query.skip, query.sort.as_deref());
    let (coupons, total) = repo.list(query.is_enable, page).await?;

    Ok(Paginated::new("Coupons found successfully", coupons, total, page))
}

/// Admin: fetch one coupon.
#[instrument(skip(state, _admin))]
pub async fn show(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<CouponId>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = CouponRepository::new(state.pool());
    let coupon = repo
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Coupon not found".to_owned()))?;

    Ok(ApiResponse::ok("Coupon found", coupon))
}

/// Admin: create a coupon and notify its entitled users.
#[instrument(skip(state, admin, body))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(body): Json<CreateCouponBody>,
) -> Result<impl IntoResponse, ApiError> {
    if !is_valid_code(&body.coupon_code) {
        return Err(ApiError::BadRequest(
            "Coupon code must be exactly 6 digits".to_owned(),
        ));
    }
    if body.end_date <= body.start_date {
        return Err(ApiError::BadRequest(
            "End date must be after start date".to_owned(),
        ));
    }
    if body.coupon_amount <= Decimal::ZERO {
        return Err(ApiError::BadRequest(
            "Coupon amount must be positive".to_owned(),
        ));
    }
    validate_entitled_users(&state, &body.users).await?;

    let repo = CouponRepository::new(state.pool());
    if repo.find_by_code(&body.coupon_code).await?.is_some() {
        return Err(ApiError::Conflict("Coupon already exists".to_owned()));
    }

    let coupon = repo
        .create(&NewCoupon {
            coupon_code: &body.coupon_code,
            coupon_amount: body.coupon_amount,
            coupon_type: body.coupon_type,
            start_date: body.start_date,
            end_date: body.end_date,
            is_enable: body.is_enable,
            users: &body.users,
        })
        .await?;

    audit::record(
        state.pool(),
        AuditEntity::Coupon,
        coupon.id,
        AuditAction::Create,
        admin.id,
        serde_json::to_value(&coupon).unwrap_or_default(),
        format!("Coupon {} created", coupon.coupon_code),
    )
    .await;

    if !coupon.users.is_empty() {
        let user_ids: Vec<UserId> = coupon.users.iter().map(|e| e.user_id).collect();
        tokio::spawn(push::notify_users(
            state.clone(),
            user_ids,
            "New Coupon Available for You".to_owned(),
            format!(
                "A new coupon with code {} has been created and is available for use.",
                coupon.coupon_code
            ),
        ));
    }

    Ok(ApiResponse::created("Coupon created successfully", coupon))
}

/// Admin: update a coupon.
#[instrument(skip(state, admin, body))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<CouponId>,
    Json(body): Json<UpdateCouponBody>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(users) = &body.users {
        validate_entitled_users(&state, users).await?;
    }

    let repo = CouponRepository::new(state.pool());
    let coupon = repo
        .update(
            id,
            &CouponPatch {
                coupon_amount: body.coupon_amount,
                coupon_type: body.coupon_type,
                start_date: body.start_date,
                end_date: body.end_date,
                is_enable: body.is_enable,
                users: body.users.as_deref(),
            },
        )
        .await?;

    audit::record(
        state.pool(),
        AuditEntity::Coupon,
        coupon.id,
        AuditAction::Update,
        admin.id,
        serde_json::to_value(&coupon).unwrap_or_default(),
        format!("Coupon {} updated", coupon.coupon_code),
    )
    .await;

    Ok(ApiResponse::ok("Coupon updated successfully", coupon))
}

/// Admin: delete a coupon.
#[instrument(skip(state, admin))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<CouponId>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = CouponRepository::new(state.pool());
    if !repo.delete(id).await? {
        return Err(ApiError::NotFound("Coupon not found".to_owned()));
    }

    audit::record(
        state.pool(),
        AuditEntity::Coupon,
        id,
        AuditAction::Delete,
        admin.id,
        serde_json::Value::Null,
        format!("Coupon {id} deleted"),
    )
    .await;

    Ok(ApiResponse::<()>::empty("Coupon deleted successfully"))
}
