//! Sub-category route handlers.

use axum::extract::{Path, Query, State};
use axum::{Json, response::IntoResponse};
use serde::Deserialize;
use tracing::instrument;

use mercata_core::slug::{normalize_name, unique_slug};
use mercata_core::{AuditAction, AuditEntity, CategoryId, SubCategoryId};

use crate::db::categories::CategoryRepository;
use crate::db::sub_categories::SubCategoryRepository;
use crate::error::ApiError;
use crate::middleware::RequireAdmin;
use crate::db::Page;
use crate::response::{ApiResponse, Paginated};
use crate::services::audit;
use crate::state::AppState;

/// List query parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSubCategoriesQuery {
    #[serde(rename = "_limit")]
    pub limit: Option<i64>,
    pub skip: Option<i64>,
    pub sort: Option<String>,
    pub name: Option<String>,
    pub category_id: Option<CategoryId>,
}

/// Create body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubCategoryBody {
    pub name: String,
    pub category_id: CategoryId,
}

/// Update body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubCategoryBody {
    pub name: Option<String>,
    pub category_id: Option<CategoryId>,
}

/// List sub-categories.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ListSubCategoriesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = SubCategoryRepository::new(state.pool());
    let page = Page::clamped(query.limit, query.skip, query.sort.as_deref());
    let (sub_categories, total) = repo
        .list(query.category_id, query.name.as_deref(), page)
        .await?;

    Ok(Paginated::new(
        "Sub-categories found successfully",
        sub_categories,
        total,
        page,
    ))
}

/// Fetch one sub-category.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<SubCategoryId>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = SubCategoryRepository::new(state.pool());
    let sub_category = repo
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Sub-category not found".to_owned()))?;

    Ok(ApiResponse::ok("Sub-category found", sub_category))
}

/// Admin: create a sub-category under an existing category.
#[instrument(skip(state, admin, body))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(body): Json<CreateSubCategoryBody>,
) -> Result<impl IntoResponse, ApiError> {
    let name = normalize_name(&body.name);
    if name.is_empty() {
        return Err(ApiError::BadRequest(
            "Sub-category name is required".to_owned(),
        ));
    }

    let categories = CategoryRepository::new(state.pool());
    if categories.get(body.category_id).await?.is_none() {
        return Err(ApiError::NotFound("Category not found".to_owned()));
    }

    let repo = SubCategoryRepository::new(state.pool());
    if repo.name_exists(body.category_id, &name).await? {
        return Err(ApiError::Conflict("Sub-category already exists".to_owned()));
    }

    let slug = unique_slug(&name, |candidate| {
        let repo = SubCategoryRepository::new(state.pool());
        async move { repo.slug_exists(&candidate).await }
    })
    .await?;

    let sub_category = repo.create(&name, &slug, body.category_id).await?;

    audit::record(
        state.pool(),
        AuditEntity::SubCategory,
        sub_category.id,
        AuditAction::Create,
        admin.id,
        serde_json::to_value(&sub_category).unwrap_or_default(),
        format!("Sub-category {} created", sub_category.name),
    )
    .await;

    Ok(ApiResponse::created(
        "Sub-category created successfully",
        sub_category,
    ))
}

/// Admin: update a sub-category. A rename re-runs the slug pipeline.
#[instrument(skip(state, admin, body))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<SubCategoryId>,
    Json(body): Json<UpdateSubCategoryBody>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(category_id) = body.category_id {
        let categories = CategoryRepository::new(state.pool());
        if categories.get(category_id).await?.is_none() {
            return Err(ApiError::NotFound("Category not found".to_owned()));
        }
    }

    let (name, slug) = match body.name.as_deref() {
        Some(raw) => {
            let name = normalize_name(raw);
            if name.is_empty() {
                return Err(ApiError::BadRequest(
                    "Sub-category name is required".to_owned(),
                ));
            }
            let slug = unique_slug(&name, |candidate| {
                let repo = SubCategoryRepository::new(state.pool());
                async move { repo.slug_exists(&candidate).await }
            })
            .await?;
            (Some(name), Some(slug))
        }
        None => (None, None),
    };

    let repo = SubCategoryRepository::new(state.pool());
    let sub_category = repo
        .update(id, name.as_deref(), slug.as_deref(), body.category_id)
        .await?;

    audit::record(
        state.pool(),
        AuditEntity::SubCategory,
        sub_category.id,
        AuditAction::Update,
        admin.id,
        serde_json::to_value(&sub_category).unwrap_or_default(),
        format!("Sub-category {} updated", sub_category.name),
    )
    .await;

    Ok(ApiResponse::ok(
        "Sub-category updated successfully",
        sub_category,
    ))
}

/// Admin: delete a sub-category.
#[instrument(skip(state, admin))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<SubCategoryId>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = SubCategoryRepository::new(state.pool());
    if !repo.delete(id).await? {
        return Err(ApiError::NotFound("Sub-category not found".to_owned()));
    }

    audit::record(
        state.pool(),
        AuditEntity::SubCategory,
        id,
        AuditAction::Delete,
        admin.id,
        serde_json::Value::Null,
        format!("Sub-category {id} deleted"),
    )
    .await;

    Ok(ApiResponse::<()>::empty("Sub-category deleted successfully"))
}
