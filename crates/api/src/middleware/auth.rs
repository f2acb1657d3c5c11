//! Authentication extractors.
//!
//! Handlers take [`CurrentUser`] to require a valid access token, or
//! [`RequireAdmin`] to additionally gate on the admin role.
//!
//! # Example
//!
//! ```rust,ignore
//! async fn my_cart(user: CurrentUser) -> impl IntoResponse {
//!     format!("cart of {}", user.email)
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use mercata_core::{Email, Role, UserId};

use crate::error::ApiError;
use crate::services::tokens;
use crate::state::AppState;

/// The authenticated caller, decoded from the `Authorization: Bearer`
/// access token.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: Email,
    pub role: Role,
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing authorization header".to_owned()))?;

        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthorized("Expected bearer token".to_owned()))?;

        let claims = tokens::verify_access(&state.config().jwt, token)
            .map_err(|_| ApiError::Unauthorized("Invalid or expired token".to_owned()))?;

        let email = Email::parse(&claims.email)
            .map_err(|_| ApiError::Unauthorized("Invalid token claims".to_owned()))?;

        Ok(Self {
            id: UserId::new(claims.sub),
            email,
            role: claims.role,
        })
    }
}

/// Extractor that additionally requires the admin role.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub CurrentUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;

        if user.role != Role::Admin {
            return Err(ApiError::Forbidden("Admin access required".to_owned()));
        }

        Ok(Self(user))
    }
}
