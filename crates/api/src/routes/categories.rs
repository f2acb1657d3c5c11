//! Category route handlers.
//!
//! Creation and rename go through the shared name-normalization and
//! slug-uniqueness pipeline in `mercata_core::slug`.

use axum::extract::{Path, Query, State};
use axum::{Json, response::IntoResponse};
use serde::Deserialize;
use tracing::instrument;

use mercata_core::slug::{normalize_name, unique_slug};
use mercata_core::{AuditAction, AuditEntity, CategoryId};

use crate::db::categories::CategoryRepository;
use crate::error::ApiError;
use crate::middleware::RequireAdmin;
use crate::db::Page;
use crate::response::{ApiResponse, Paginated};
use crate::services::{audit, push};
use crate::state::AppState;

/// List query parameters.
#[derive(Debug, Deserialize)]
pub struct ListCategoriesQuery {
    #[serde(rename = "_limit")]
    pub limit: Option<i64>,
    pub skip: Option<i64>,
    pub sort: Option<String>,
    pub name: Option<String>,
}

/// Create body.
#[derive(Debug, Deserialize)]
pub struct CreateCategoryBody {
    pub name: String,
    pub image: Option<String>,
}

/// Update body.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateCategoryBody {
    pub name: Option<String>,
    pub image: Option<String>,
}

/// List categories.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ListCategoriesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = CategoryRepository::new(state.pool());
    let page = Page::clamped(query.limit, query.skip, query.sort.as_deref());
    let (categories, total) = repo.list(query.name.as_deref(), page).await?;

    Ok(Paginated::new(
        "Categories found successfully",
        categories,
        total,
        page,
    ))
}

/// Fetch one category.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = CategoryRepository::new(state.pool());
    let category = repo
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Category not found".to_owned()))?;

    Ok(ApiResponse::ok("Category found", category))
}

/// Admin: create a category.
#[instrument(skip(state, admin, body))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(body): Json<CreateCategoryBody>,
) -> Result<impl IntoResponse, ApiError> {
    let name = normalize_name(&body.name);
    if name.is_empty() {
        return Err(ApiError::BadRequest("Category name is required".to_owned()));
    }

    let repo = CategoryRepository::new(state.pool());
    if repo.name_exists(&name).await? {
        return Err(ApiError::Conflict("Category already exists".to_owned()));
    }

    let slug = unique_slug(&name, |candidate| {
        let repo = CategoryRepository::new(state.pool());
        async move { repo.slug_exists(&candidate).await }
    })
    .await?;

    let category = repo.create(&name, &slug, body.image.as_deref()).await?;

    audit::record(
        state.pool(),
        AuditEntity::Category,
        category.id,
        AuditAction::Create,
        admin.id,
        serde_json::to_value(&category).unwrap_or_default(),
        format!("Category {} created", category.name),
    )
    .await;

    tokio::spawn(push::broadcast_all(
        state.clone(),
        "New Category Added!".to_owned(),
        format!("Check out our new category: {}", category.name),
    ));

    Ok(ApiResponse::created("Category created successfully", category))
}

/// Admin: update a category. A rename re-runs the slug pipeline.
#[instrument(skip(state, admin, body))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<CategoryId>,
    Json(body): Json<UpdateCategoryBody>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = CategoryRepository::new(state.pool());

    let (name, slug) = match body.name.as_deref() {
        Some(raw) => {
            let name = normalize_name(raw);
            if name.is_empty() {
                return Err(ApiError::BadRequest("Category name is required".to_owned()));
            }
            let slug = unique_slug(&name, |candidate| {
                let repo = CategoryRepository::new(state.pool());
                async move { repo.slug_exists(&candidate).await }
            })
            .await?;
            (Some(name), Some(slug))
        }
        None => (None, None),
    };

    let category = repo
        .update(id, name.as_deref(), slug.as_deref(), body.image.as_deref())
        .await?;

    audit::record(
        state.pool(),
        AuditEntity::Category,
        category.id,
        AuditAction::Update,
        admin.id,
        serde_json::to_value(&category).unwrap_or_default(),
        format!("Category {} updated", category.name),
    )
    .await;

    Ok(ApiResponse::ok("Category updated successfully", category))
}

/// Admin: delete a category.
///
/// Refused while products still reference it; sub-categories go with it.
#[instrument(skip(state, admin))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<CategoryId>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = CategoryRepository::new(state.pool());

    if repo.product_count(id).await? > 0 {
        return Err(ApiError::Conflict(
            "Category still has products and cannot be deleted".to_owned(),
        ));
    }

    if !repo.delete(id).await? {
        return Err(ApiError::NotFound("Category not found".to_owned()));
    }

    audit::record(
        state.pool(),
        AuditEntity::Category,
        id,
        AuditAction::Delete,
        admin.id,
        serde_json::Value::Null,
        format!("Category {id} deleted"),
    )
    .await;

    Ok(ApiResponse::<()>::empty("Category deleted successfully"))
}
