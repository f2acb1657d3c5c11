//! Cart aggregate model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use mercata_core::{CartId, CouponId, ProductId, UserId};

/// One line of a cart: a product reference with quantity and chosen color.
///
/// The cart holds at most one line per product; adding an already-present
/// product is a conflict, not a quantity merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: i32,
    #[serde(default)]
    pub color: String,
}

impl CartLine {
    /// A fresh line: quantity 1, no color chosen yet.
    #[must_use]
    pub const fn new(product_id: ProductId) -> Self {
        Self {
            product_id,
            quantity: 1,
            color: String::new(),
        }
    }
}

/// A coupon recorded on the cart at the moment it was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedCoupon {
    pub coupon_code: String,
    pub coupon_id: CouponId,
}

/// The per-user cart aggregate. At most one exists per user; it is created
/// lazily on the first add and deleted when its last line is removed.
///
/// `total_price` is derived state: the line subtotal minus any coupon
/// discounts subtracted at application time, floored at zero. `version`
/// backs optimistic concurrency - every write is conditional on it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    #[serde(rename = "cartItems")]
    pub items: Vec<CartLine>,
    pub coupons: Vec<AppliedCoupon>,
    pub total_price: Decimal,
    #[serde(skip)]
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Index of the line holding `product_id`, if any.
    #[must_use]
    pub fn line_index(&self, product_id: ProductId) -> Option<usize> {
        self.items.iter().position(|l| l.product_id == product_id)
    }

    /// Whether `code` is already in the applied-coupon list.
    #[must_use]
    pub fn has_coupon_code(&self, code: &str) -> bool {
        self.coupons.iter().any(|c| c.coupon_code == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_line_defaults() {
        let line = CartLine::new(ProductId::new(3));
        assert_eq!(line.quantity, 1);
        assert!(line.color.is_empty());
    }

    #[test]
    fn test_line_json_defaults_color() {
        // Lines persisted before color was recorded deserialize with "".
        let line: CartLine =
            serde_json::from_str(r#"{"productId": 5, "quantity": 2}"#).expect("deserialize");
        assert_eq!(line.product_id, ProductId::new(5));
        assert!(line.color.is_empty());
    }
}
