//! User and password-reset models.

use chrono::{DateTime, Utc};
use serde::Serialize;

use mercata_core::{Email, OtpId, Role, UserId};

/// A registered account.
///
/// The password hash is deliberately not part of this struct; repositories
/// return it separately where verification needs it, so a `User` can be
/// serialized into responses as-is.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: Option<String>,
    pub email: Email,
    pub role: Role,
    pub avatar: Option<String>,
    pub age: Option<i32>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub gender: Option<String>,
    /// Cleared by self-service account deletion instead of dropping the row.
    pub active: bool,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A pending password-reset code.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Otp {
    pub id: OtpId,
    pub email: Email,
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Otp {
    /// Whether the code is still usable at `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}
