//! Coupon ledger model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use mercata_core::{CouponId, CouponType, UserId};

/// Per-user usage terms on a coupon.
///
/// A coupon with an entitlement for a user enforces `usage_count <
/// max_count` and the `disabled` flag through the ledger. Users without an
/// entitlement are only guarded by the cart's own applied-code list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEntitlement {
    pub user_id: UserId,
    pub max_count: i32,
    #[serde(default)]
    pub usage_count: i32,
    #[serde(default)]
    pub disabled: bool,
}

/// A discount code.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: CouponId,
    /// Exactly six ASCII digits, unique across all coupons.
    pub coupon_code: String,
    pub coupon_amount: Decimal,
    pub coupon_type: CouponType,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_enable: bool,
    pub users: Vec<UserEntitlement>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Coupon {
    /// The entitlement recorded for `user_id`, if any.
    #[must_use]
    pub fn entitlement_for(&self, user_id: UserId) -> Option<&UserEntitlement> {
        self.users.iter().find(|e| e.user_id == user_id)
    }

    /// Whether the coupon is enabled and `now` falls inside its window.
    #[must_use]
    pub fn is_applicable_at(&self, now: DateTime<Utc>) -> bool {
        self.is_enable && self.start_date <= now && now <= self.end_date
    }
}

/// Validate the shape of a coupon code: exactly six ASCII digits.
#[must_use]
pub fn is_valid_code(code: &str) -> bool {
    code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_shape() {
        assert!(is_valid_code("123456"));
        assert!(!is_valid_code("12345"));
        assert!(!is_valid_code("1234567"));
        assert!(!is_valid_code("12a456"));
        assert!(!is_valid_code(""));
    }

    #[test]
    fn test_applicability_window() {
        let now = Utc::now();
        let coupon = Coupon {
            id: CouponId::new(1),
            coupon_code: "123456".to_owned(),
            coupon_amount: Decimal::from(10),
            coupon_type: CouponType::FixedAmount,
            start_date: now - chrono::Duration::days(1),
            end_date: now + chrono::Duration::days(1),
            is_enable: true,
            users: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        assert!(coupon.is_applicable_at(now));
        assert!(!coupon.is_applicable_at(now + chrono::Duration::days(2)));

        let disabled = Coupon {
            is_enable: false,
            ..coupon
        };
        assert!(!disabled.is_applicable_at(now));
    }
}
