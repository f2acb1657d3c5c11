//! Web-push subscription model.

use chrono::{DateTime, Utc};
use serde::Serialize;

use mercata_core::{SubscriptionId, UserId};

/// A browser push subscription registered by a user.
///
/// `endpoint` is the delivery URL handed out by the browser's push service;
/// `p256dh` and `auth` are the client keys that accompany it.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PushSubscription {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
    pub created_at: DateTime<Utc>,
}
