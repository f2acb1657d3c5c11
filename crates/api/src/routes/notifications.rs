//! Push notification route handlers.

use axum::extract::State;
use axum::{Json, response::IntoResponse};
use serde::Deserialize;
use tracing::instrument;

use mercata_core::UserId;

use crate::db::push_subscriptions::PushSubscriptionRepository;
use crate::error::ApiError;
use crate::middleware::{CurrentUser, RequireAdmin};
use crate::response::ApiResponse;
use crate::services::push;
use crate::state::AppState;

/// Browser push subscription keys.
#[derive(Debug, Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

/// Subscribe request body (the browser's `PushSubscription` shape).
#[derive(Debug, Deserialize)]
pub struct SubscribeBody {
    pub endpoint: String,
    pub keys: SubscriptionKeys,
}

/// Unsubscribe request body.
#[derive(Debug, Deserialize)]
pub struct UnsubscribeBody {
    pub endpoint: String,
}

/// Admin broadcast request body. Without `userIds` the notification goes
/// to every subscriber.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendBody {
    pub title: String,
    pub body: String,
    pub user_ids: Option<Vec<UserId>>,
}

/// Register the caller's browser for push notifications.
#[instrument(skip(state, user, body))]
pub async fn subscribe(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<SubscribeBody>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = PushSubscriptionRepository::new(state.pool());
    let subscription = repo
        .upsert(user.id, &body.endpoint, &body.keys.p256dh, &body.keys.auth)
        .await?;

    Ok(ApiResponse::created("Subscribed successfully", subscription))
}

/// Remove a push subscription.
#[instrument(skip(state, _user, body))]
pub async fn unsubscribe(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(body): Json<UnsubscribeBody>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = PushSubscriptionRepository::new(state.pool());
    if !repo.delete_by_endpoint(&body.endpoint).await? {
        return Err(ApiError::NotFound("Subscription not found".to_owned()));
    }

    Ok(ApiResponse::<()>::empty("Unsubscribed successfully"))
}

/// Admin: broadcast a notification. Delivery happens in the background;
/// per-endpoint failures are logged, never surfaced.
#[instrument(skip(state, _admin, body))]
pub async fn send(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Json(body): Json<SendBody>,
) -> Result<impl IntoResponse, ApiError> {
    match body.user_ids {
        Some(user_ids) => {
            tokio::spawn(push::notify_users(
                state.clone(),
                user_ids,
                body.title,
                body.body,
            ));
        }
        None => {
            tokio::spawn(push::broadcast_all(state.clone(), body.title, body.body));
        }
    }

    Ok(ApiResponse::<()>::empty("Notification dispatch started"))
}
