//! Brand route handlers.

use axum::extract::{Path, Query, State};
use axum::{Json, response::IntoResponse};
use serde::Deserialize;
use tracing::instrument;

use mercata_core::slug::{normalize_name, unique_slug};
use mercata_core::{AuditAction, AuditEntity, BrandId};

use crate::db::brands::BrandRepository;
use crate::error::ApiError;
use crate::middleware::RequireAdmin;
use crate::db::Page;
use crate::response::{ApiResponse, Paginated};
use crate::services::audit;
use crate::state::AppState;

/// List query parameters.
#[derive(Debug, Deserialize)]
pub struct ListBrandsQuery {
    #[serde(rename = "_limit")]
    pub limit: Option<i64>,
    pub skip: Option<i64>,
    pub sort: Option<String>,
    pub name: Option<String>,
}

/// Create body.
#[derive(Debug, Deserialize)]
pub struct CreateBrandBody {
    pub name: String,
    pub image: Option<String>,
}

/// Update body.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateBrandBody {
    pub name: Option<String>,
    pub image: Option<String>,
}

/// List brands.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ListBrandsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = BrandRepository::new(state.pool());
    let page = Page::clamped(query.limit, query.skip, query.sort.as_deref());
    let (brands, total) = repo.list(query.name.as_deref(), page).await?;

    Ok(Paginated::new("Brands found successfully", brands, total, page))
}

/// Fetch one brand.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<BrandId>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = BrandRepository::new(state.pool());
    let brand = repo
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Brand not found".to_owned()))?;

    Ok(ApiResponse::ok("Brand found", brand))
}

/// Admin: create a brand.
#[instrument(skip(state, admin, body))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(body): Json<CreateBrandBody>,
) -> Result<impl IntoResponse, ApiError> {
    let name = normalize_name(&body.name);
    if name.is_empty() {
        return Err(ApiError::BadRequest("Brand name is required".to_owned()));
    }

    let repo = BrandRepository::new(state.pool());
    if repo.name_exists(&name).await? {
        return Err(ApiError::Conflict("Brand already exists".to_owned()));
    }

    let slug = unique_slug(&name, |candidate| {
        let repo = BrandRepository::new(state.pool());
        async move { repo.slug_exists(&candidate).await }
    })
    .await?;

    let brand = repo.create(&name, &slug, body.image.as_deref()).await?;

    audit::record(
        state.pool(),
        AuditEntity::Brand,
        brand.id,
        AuditAction::Create,
        admin.id,
        serde_json::to_value(&brand).unwrap_or_default(),
        format!("Brand {} created", brand.name),
    )
    .await;

    Ok(ApiResponse::created("Brand created successfully", brand))
}

/// Admin: update a brand. A rename re-runs the slug pipeline.
#[instrument(skip(state, admin, body))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<BrandId>,
    Json(body): Json<UpdateBrandBody>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = BrandRepository::new(state.pool());

    let (name, slug) = match body.name.as_deref() {
        Some(raw) => {
            let name = normalize_name(raw);
            if name.is_empty() {
                return Err(ApiError::BadRequest("Brand name is required".to_owned()));
            }
            let slug = unique_slug(&name, |candidate| {
                let repo = BrandRepository::new(state.pool());
                async move { repo.slug_exists(&candidate).await }
            })
            .await?;
            (Some(name), Some(slug))
        }
        None => (None, None),
    };

    let brand = repo
        .update(id, name.as_deref(), slug.as_deref(), body.image.as_deref())
        .await?;

    audit::record(
        state.pool(),
        AuditEntity::Brand,
        brand.id,
        AuditAction::Update,
        admin.id,
        serde_json::to_value(&brand).unwrap_or_default(),
        format!("Brand {} updated", brand.name),
    )
    .await;

    Ok(ApiResponse::ok("Brand updated successfully", brand))
}

/// Admin: delete a brand.
#[instrument(skip(state, admin))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<BrandId>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = BrandRepository::new(state.pool());
    if !repo.delete(id).await? {
        return Err(ApiError::NotFound("Brand not found".to_owned()));
    }

    audit::record(
        state.pool(),
        AuditEntity::Brand,
        id,
        AuditAction::Delete,
        admin.id,
        serde_json::Value::Null,
        format!("Brand {id} deleted"),
    )
    .await;

    Ok(ApiResponse::<()>::empty("Brand deleted successfully"))
}
