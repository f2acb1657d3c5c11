//! Unified error handling with Sentry integration.
//!
//! Provides a unified `ApiError` type that captures server-class errors to
//! Sentry before responding to the client. All route handlers return
//! `Result<T, ApiError>`, and every response body - success or failure -
//! uses the same `{status, message, data}` envelope.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::cart::CartError;
use crate::services::mail::MailError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(RepositoryError),

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate resource or conflicting concurrent write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The product has no stock left.
    #[error("out of stock: {0}")]
    OutOfStock(String),

    /// A coupon's per-user usage cap is exhausted.
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// A coupon is disabled for the requesting user.
    #[error("coupon disabled: {0}")]
    CouponDisabled(String),

    /// Missing or invalid credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::OutOfStock(_)
            | Self::LimitExceeded(_)
            | Self::CouponDisabled(_)
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry; client errors are just responses.
        if matches!(self, Self::Database(_) | Self::Internal(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_owned(),
            other => other_message(other),
        };

        let body = serde_json::json!({
            "status": status.as_u16(),
            "message": message,
            "data": serde_json::Value::Null,
        });

        (status, Json(body)).into_response()
    }
}

fn other_message(err: &ApiError) -> String {
    match err {
        ApiError::NotFound(m)
        | ApiError::Conflict(m)
        | ApiError::OutOfStock(m)
        | ApiError::LimitExceeded(m)
        | ApiError::CouponDisabled(m)
        | ApiError::Unauthorized(m)
        | ApiError::Forbidden(m)
        | ApiError::BadRequest(m) => m.clone(),
        ApiError::Database(_) | ApiError::Internal(_) => "Internal server error".to_owned(),
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound("resource not found".to_owned()),
            RepositoryError::Conflict(m) => Self::Conflict(m),
            other => Self::Database(other),
        }
    }
}

impl From<CartError> for ApiError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::ProductNotFound => Self::NotFound("Product not found".to_owned()),
            CartError::ProductOutOfStock => Self::OutOfStock("Product is out of stock".to_owned()),
            CartError::ProductAlreadyInCart => {
                Self::Conflict("Product is already added to the cart".to_owned())
            }
            CartError::LineNotFound => Self::NotFound("Product not found in cart".to_owned()),
            CartError::CartNotFound => Self::NotFound("Cart not found".to_owned()),
            CartError::CouponNotFound => {
                Self::NotFound("Coupon not found or not valid".to_owned())
            }
            CartError::CouponDisabled => {
                Self::CouponDisabled("Coupon is disabled for this user".to_owned())
            }
            CartError::CouponLimitExceeded => {
                Self::LimitExceeded("Coupon usage limit exceeded".to_owned())
            }
            CartError::CouponAlreadyApplied => Self::Conflict("Coupon already used".to_owned()),
            CartError::ConcurrentModification => {
                Self::Conflict("Cart was modified concurrently, retry".to_owned())
            }
            CartError::Repository(e) => e.into(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidEmail(e) => Self::BadRequest(e.to_string()),
            AuthError::WeakPassword(m) => Self::BadRequest(m),
            AuthError::UserAlreadyExists => Self::Conflict("User already exists".to_owned()),
            AuthError::InvalidCredentials => {
                Self::BadRequest("Invalid email or password".to_owned())
            }
            AuthError::EmailNotVerified => Self::Unauthorized(
                "Email is not verified, a new verification link has been sent".to_owned(),
            ),
            AuthError::InvalidToken => {
                Self::Unauthorized("Invalid or expired token".to_owned())
            }
            AuthError::RefreshExhausted => Self::Unauthorized(
                "Refresh token exhausted, please sign in again".to_owned(),
            ),
            AuthError::UserNotFound => Self::NotFound("User not found".to_owned()),
            AuthError::InvalidOtp => Self::BadRequest("Invalid or expired code".to_owned()),
            AuthError::PasswordHash => Self::Internal("password hashing failed".to_owned()),
            AuthError::Mail(e) => Self::Internal(format!("failed to send email: {e}")),
            AuthError::Repository(e) => e.into(),
        }
    }
}

impl From<MailError> for ApiError {
    fn from(err: MailError) -> Self {
        Self::Internal(format!("mail delivery failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            status_of(ApiError::NotFound("x".to_owned())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ApiError::Conflict("x".to_owned())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ApiError::OutOfStock("x".to_owned())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ApiError::Unauthorized("x".to_owned())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(ApiError::Forbidden("x".to_owned())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(ApiError::Internal("x".to_owned())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_cart_error_mapping() {
        assert_eq!(
            status_of(CartError::ProductAlreadyInCart.into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(CartError::ProductOutOfStock.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(CartError::CartNotFound.into()),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let response = ApiError::Internal("connection pool exhausted".to_owned()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        // The body carries the generic message, never the internal detail.
    }
}
