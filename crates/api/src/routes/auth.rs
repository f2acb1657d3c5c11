//! Auth route handlers.

use axum::extract::{Path, State};
use axum::{Json, response::IntoResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::ApiError;
use crate::models::User;
use crate::response::ApiResponse;
use crate::services::auth::AuthService;
use crate::state::AppState;

/// Signup request body.
#[derive(Debug, Deserialize)]
pub struct SignUpBody {
    pub name: Option<String>,
    pub email: String,
    pub password: String,
}

/// Sign-in request body.
#[derive(Debug, Deserialize)]
pub struct SignInBody {
    pub email: String,
    pub password: String,
}

/// Refresh request body.
#[derive(Debug, Deserialize)]
pub struct RefreshBody {
    pub refresh_token: String,
}

/// Forgot-password request body.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordBody {
    pub email: String,
}

/// Reset-password request body.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordBody {
    pub email: String,
    pub code: String,
    pub password: String,
}

/// Sign-in response: the envelope plus the token pair.
#[derive(Debug, Serialize)]
pub struct SignInResponse {
    pub status: u16,
    pub message: String,
    pub data: User,
    pub access_token: String,
    pub refresh_token: String,
}

/// Refresh response: a fresh token pair.
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub status: u16,
    pub message: String,
    pub access_token: String,
    pub refresh_token: String,
}

/// Register a new account.
#[instrument(skip(state, body))]
pub async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignUpBody>,
) -> Result<impl IntoResponse, ApiError> {
    let service = AuthService::new(state.pool(), state.config(), state.mail());
    service
        .signup(body.name.as_deref(), &body.email, &body.password, Utc::now())
        .await?;

    Ok(ApiResponse::<()>::empty(
        "Signup successful! Please check your email to verify your account.",
    ))
}

/// Verify an email address from an emailed token.
#[instrument(skip(state, token))]
pub async fn verify_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let service = AuthService::new(state.pool(), state.config(), state.mail());
    let user = service.verify_email(&token).await?;

    Ok(ApiResponse::ok("Email verified successfully", user))
}

/// Password sign-in.
#[instrument(skip(state, body))]
pub async fn sign_in(
    State(state): State<AppState>,
    Json(body): Json<SignInBody>,
) -> Result<impl IntoResponse, ApiError> {
    let service = AuthService::new(state.pool(), state.config(), state.mail());
    let (user, tokens) = service
        .sign_in(&body.email, &body.password, Utc::now())
        .await?;

    Ok(Json(SignInResponse {
        status: 200,
        message: "Signed in successfully".to_owned(),
        data: user,
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
    }))
}

/// Rotate the refresh token.
#[instrument(skip(state, body))]
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(body): Json<RefreshBody>,
) -> Result<impl IntoResponse, ApiError> {
    let service = AuthService::new(state.pool(), state.config(), state.mail());
    let tokens = service.refresh(&body.refresh_token, Utc::now())?;

    Ok(Json(RefreshResponse {
        status: 200,
        message: "Refreshed access token successfully".to_owned(),
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
    }))
}

/// Send a password-reset code.
///
/// Always answers the same way, so the endpoint cannot be used to probe
/// for registered addresses.
#[instrument(skip(state, body))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<ForgotPasswordBody>,
) -> Result<impl IntoResponse, ApiError> {
    let service = AuthService::new(state.pool(), state.config(), state.mail());
    service.forgot_password(&body.email, Utc::now()).await?;

    Ok(ApiResponse::<()>::empty(
        "If the email exists, a reset code has been sent.",
    ))
}

/// Redeem a password-reset code.
#[instrument(skip(state, body))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordBody>,
) -> Result<impl IntoResponse, ApiError> {
    let service = AuthService::new(state.pool(), state.config(), state.mail());
    service
        .reset_password(&body.email, &body.code, &body.password, Utc::now())
        .await?;

    Ok(ApiResponse::<()>::empty("Password reset successfully"))
}
