//! User route handlers: admin CRUD plus self-service profile endpoints.

use axum::extract::{Path, Query, State};
use axum::{Json, response::IntoResponse};
use serde::Deserialize;
use tracing::instrument;

use mercata_core::{AuditAction, AuditEntity, Email, Role, UserId};

use crate::db::users::{NewUser, UserFilter, UserPatch, UserRepository};
use crate::error::ApiError;
use crate::middleware::{CurrentUser, RequireAdmin};
use crate::db::Page;
use crate::response::{ApiResponse, Paginated};
use crate::services::audit;
use crate::services::auth::hash_password;
use crate::state::AppState;

/// Admin list query parameters.
#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    #[serde(rename = "_limit")]
    pub limit: Option<i64>,
    pub skip: Option<i64>,
    pub sort: Option<String>,
    pub role: Option<Role>,
    pub name: Option<String>,
}

/// Admin create body.
#[derive(Debug, Deserialize)]
pub struct CreateUserBody {
    pub name: Option<String>,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
}

/// Update body shared by admin update and `PATCH /users/me`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserBody {
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub age: Option<i32>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub gender: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

impl UpdateUserBody {
    fn into_patch(self, allow_role_change: bool) -> UserPatch {
        UserPatch {
            name: self.name,
            avatar: self.avatar,
            age: self.age,
            phone_number: self.phone_number,
            address: self.address,
            gender: self.gender,
            role: if allow_role_change { self.role } else { None },
        }
    }
}

/// Admin: list users.
#[instrument(skip(state, _admin))]
pub async fn index(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Query(query): Query<ListUsersQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = UserRepository::new(state.pool());
    let filter = UserFilter {
        role: query.role,
        name: query.name,
    };
    let page = Page::clamped(query.limit, query.skip, query.sort.as_deref());
    let (users, total) = repo.list(&filter, page).await?;

    Ok(Paginated::new("Users found successfully", users, total, page))
}

/// Admin: create a user.
#[instrument(skip(state, admin, body))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(body): Json<CreateUserBody>,
) -> Result<impl IntoResponse, ApiError> {
    let email =
        Email::parse(&body.email).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let password_hash = hash_password(&body.password)?;

    let repo = UserRepository::new(state.pool());
    let user = repo
        .create(&NewUser {
            name: body.name.as_deref(),
            email: &email,
            password_hash: &password_hash,
            role: body.role,
        })
        .await?;

    audit::record(
        state.pool(),
        AuditEntity::User,
        user.id,
        AuditAction::Create,
        admin.id,
        serde_json::to_value(&user).unwrap_or_default(),
        format!("User {} created by admin", user.email),
    )
    .await;

    Ok(ApiResponse::created("User created successfully", user))
}

/// Admin: fetch one user.
#[instrument(skip(state, _admin))]
pub async fn show(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<UserId>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = UserRepository::new(state.pool());
    let user = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_owned()))?;

    Ok(ApiResponse::ok("User found", user))
}

/// Admin: update one user.
#[instrument(skip(state, admin, body))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
    Json(body): Json<UpdateUserBody>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = UserRepository::new(state.pool());

    if let Some(password) = &body.password {
        let password_hash = hash_password(password)?;
        repo.set_password(id, &password_hash).await?;
    }

    let user = repo.update(id, &body.into_patch(true)).await?;

    audit::record(
        state.pool(),
        AuditEntity::User,
        user.id,
        AuditAction::Update,
        admin.id,
        serde_json::to_value(&user).unwrap_or_default(),
        format!("User {} updated by admin", user.email),
    )
    .await;

    Ok(ApiResponse::ok("User updated successfully", user))
}

/// Admin: delete one user.
#[instrument(skip(state, admin))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = UserRepository::new(state.pool());
    if !repo.delete(id).await? {
        return Err(ApiError::NotFound("User not found".to_owned()));
    }

    audit::record(
        state.pool(),
        AuditEntity::User,
        id,
        AuditAction::Delete,
        admin.id,
        serde_json::Value::Null,
        format!("User {id} deleted by admin"),
    )
    .await;

    Ok(ApiResponse::<()>::empty("User deleted successfully"))
}

/// Own profile.
#[instrument(skip(state, user))]
pub async fn me(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let repo = UserRepository::new(state.pool());
    let profile = repo
        .get_by_id(user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_owned()))?;

    Ok(ApiResponse::ok("User found", profile))
}

/// Update own profile. Role changes are ignored on this path.
#[instrument(skip(state, user, body))]
pub async fn update_me(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<UpdateUserBody>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = UserRepository::new(state.pool());

    if let Some(password) = &body.password {
        let password_hash = hash_password(password)?;
        repo.set_password(user.id, &password_hash).await?;
    }

    let profile = repo.update(user.id, &body.into_patch(false)).await?;

    Ok(ApiResponse::ok("Profile updated successfully", profile))
}

/// Deactivate own account.
#[instrument(skip(state, user))]
pub async fn delete_me(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let repo = UserRepository::new(state.pool());
    repo.deactivate(user.id).await?;

    Ok(ApiResponse::<()>::empty("Account deactivated"))
}
