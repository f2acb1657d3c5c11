//! Wishlist model.

use chrono::{DateTime, Utc};
use serde::Serialize;

use mercata_core::{ProductId, UserId, WishlistId};

/// One saved product for one user. The `(user_id, product_id)` pair is
/// unique.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WishlistEntry {
    pub id: WishlistId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub created_at: DateTime<Utc>,
}
