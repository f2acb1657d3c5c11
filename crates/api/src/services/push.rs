//! Web-push delivery.
//!
//! Posts notification payloads to each stored subscription endpoint.
//! Delivery is always fire-and-forget from the caller's point of view:
//! failures are logged per endpoint, and endpoints that answer 404/410 are
//! pruned from storage.

use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde::Serialize;

use mercata_core::SubscriptionId;

use crate::config::PushConfig;
use crate::db::push_subscriptions::PushSubscriptionRepository;
use crate::models::PushSubscription;
use crate::state::AppState;

/// The notification body delivered to subscribers.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
}

/// Web-push delivery client.
#[derive(Clone)]
pub struct PushClient {
    client: reqwest::Client,
    gateway_key: Option<String>,
}

impl PushClient {
    /// Create a new push client.
    #[must_use]
    pub fn new(config: &PushConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            gateway_key: config
                .gateway_key
                .as_ref()
                .map(|k| k.expose_secret().to_owned()),
        }
    }

    /// Deliver one payload to one subscription.
    ///
    /// Returns `Ok(false)` when the endpoint reports itself gone (the
    /// subscription should be pruned), `Ok(true)` on success.
    ///
    /// # Errors
    ///
    /// Returns `reqwest::Error` on transport failure.
    pub async fn deliver(
        &self,
        subscription: &PushSubscription,
        payload: &NotificationPayload,
    ) -> Result<bool, reqwest::Error> {
        let mut request = self
            .client
            .post(&subscription.endpoint)
            .header("TTL", "86400")
            .json(payload);

        if let Some(key) = &self.gateway_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Ok(false);
        }
        if !status.is_success() {
            tracing::warn!(
                endpoint = %subscription.endpoint,
                status = %status,
                "push delivery rejected"
            );
        }

        Ok(true)
    }

    /// Deliver a payload to many subscriptions, returning the IDs of
    /// subscriptions whose endpoints are gone.
    pub async fn fan_out(
        &self,
        subscriptions: &[PushSubscription],
        payload: &NotificationPayload,
    ) -> Vec<SubscriptionId> {
        let mut dead = Vec::new();

        for subscription in subscriptions {
            match self.deliver(subscription, payload).await {
                Ok(true) => {}
                Ok(false) => dead.push(subscription.id),
                Err(e) => {
                    tracing::warn!(
                        endpoint = %subscription.endpoint,
                        error = %e,
                        "push delivery failed"
                    );
                }
            }
        }

        dead
    }
}

/// Broadcast to every subscriber. Best-effort: call sites spawn this and
/// move on.
pub async fn broadcast_all(state: AppState, title: String, body: String) {
    let repo = PushSubscriptionRepository::new(state.pool());
    let subscriptions = match repo.list_all().await {
        Ok(subs) => subs,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load push subscriptions");
            return;
        }
    };

    let payload = NotificationPayload { title, body };
    let dead = state.push().fan_out(&subscriptions, &payload).await;

    if !dead.is_empty()
        && let Err(e) = repo.delete_many(&dead).await
    {
        tracing::warn!(error = %e, "failed to prune dead push subscriptions");
    }
}

/// Broadcast to a specific set of users. Best-effort, same contract as
/// [`broadcast_all`].
pub async fn notify_users(
    state: AppState,
    user_ids: Vec<mercata_core::UserId>,
    title: String,
    body: String,
) {
    let repo = PushSubscriptionRepository::new(state.pool());
    let subscriptions = match repo.list_by_users(&user_ids).await {
        Ok(subs) => subs,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load push subscriptions");
            return;
        }
    };

    let payload = NotificationPayload { title, body };
    let dead = state.push().fan_out(&subscriptions, &payload).await;

    if !dead.is_empty()
        && let Err(e) = repo.delete_many(&dead).await
    {
        tracing::warn!(error = %e, "failed to prune dead push subscriptions");
    }
}
