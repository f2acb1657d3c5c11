//! Cart pricing engine.
//!
//! Pure arithmetic over resolved product prices; no I/O. The cart service
//! feeds it lines and the products they reference and persists whatever it
//! returns.
//!
//! Coupon discounts are deliberately not part of the subtotal recompute:
//! they are subtracted once, at the moment a coupon is applied, against the
//! total as it stands then. A later line mutation recomputes the subtotal
//! from lines alone.

use rust_decimal::Decimal;

use mercata_core::{CouponType, ProductId};

use crate::models::CartLine;

/// The slice of a product the pricing engine needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductPricing {
    pub id: ProductId,
    pub price: Decimal,
    pub price_after_discount: Option<Decimal>,
    /// Units in stock; consulted by the cart service, not by pricing.
    pub quantity: i32,
}

impl ProductPricing {
    /// The price a cart line pays per unit: the promotional price when it is
    /// present and positive, the list price otherwise.
    #[must_use]
    pub fn effective_price(&self) -> Decimal {
        match self.price_after_discount {
            Some(p) if p > Decimal::ZERO => p,
            _ => self.price,
        }
    }
}

/// Sum of `quantity x effective price` over all lines.
///
/// A line whose product is missing from `products` contributes nothing;
/// resolution is the caller's job.
#[must_use]
pub fn recompute_subtotal(lines: &[CartLine], products: &[ProductPricing]) -> Decimal {
    lines
        .iter()
        .filter_map(|line| {
            products
                .iter()
                .find(|p| p.id == line.product_id)
                .map(|p| p.effective_price() * Decimal::from(line.quantity))
        })
        .sum()
}

/// Subtract one coupon's discount from `total`, flooring at zero.
///
/// `FixedAmount` subtracts `amount` once; `Percentage` subtracts
/// `total * amount / 100`. Either way the discount is computed against the
/// total as passed in, so stacked coupons compound in application order.
#[must_use]
pub fn apply_discount(total: Decimal, coupon_type: CouponType, amount: Decimal) -> Decimal {
    let discount = match coupon_type {
        CouponType::FixedAmount => amount,
        CouponType::Percentage => total * amount / Decimal::from(100),
    };

    (total - discount).max(Decimal::ZERO)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(id: i32, price: i64, discounted: Option<i64>) -> ProductPricing {
        ProductPricing {
            id: ProductId::new(id),
            price: Decimal::from(price),
            price_after_discount: discounted.map(Decimal::from),
            quantity: 10,
        }
    }

    fn line(id: i32, quantity: i32) -> CartLine {
        CartLine {
            product_id: ProductId::new(id),
            quantity,
            color: String::new(),
        }
    }

    #[test]
    fn test_effective_price_prefers_positive_discount() {
        assert_eq!(product(1, 100, Some(80)).effective_price(), Decimal::from(80));
        assert_eq!(product(1, 100, None).effective_price(), Decimal::from(100));
        // A zero promotional price means "no promotion", not "free".
        assert_eq!(product(1, 100, Some(0)).effective_price(), Decimal::from(100));
    }

    #[test]
    fn test_subtotal_discounted_price_times_quantity() {
        // price 100, discounted 80, quantity 2 -> 160
        let total = recompute_subtotal(&[line(1, 2)], &[product(1, 100, Some(80))]);
        assert_eq!(total, Decimal::from(160));
    }

    #[test]
    fn test_subtotal_sums_lines() {
        let products = [product(1, 100, None), product(2, 25, Some(20))];
        let lines = [line(1, 1), line(2, 3)];
        assert_eq!(recompute_subtotal(&lines, &products), Decimal::from(160));
    }

    #[test]
    fn test_subtotal_skips_unresolved_products() {
        let total = recompute_subtotal(&[line(1, 2), line(9, 5)], &[product(1, 10, None)]);
        assert_eq!(total, Decimal::from(20));
    }

    #[test]
    fn test_fixed_discount() {
        // total 100, fixed 30 -> 70
        let total = apply_discount(Decimal::from(100), CouponType::FixedAmount, Decimal::from(30));
        assert_eq!(total, Decimal::from(70));
    }

    #[test]
    fn test_percentage_compounds_against_current_total() {
        // 100 - 30 fixed -> 70, then 10% of 70 -> 63 (not 10% of 100)
        let after_fixed =
            apply_discount(Decimal::from(100), CouponType::FixedAmount, Decimal::from(30));
        let after_pct =
            apply_discount(after_fixed, CouponType::Percentage, Decimal::from(10));
        assert_eq!(after_pct, Decimal::from(63));
    }

    #[test]
    fn test_discount_floors_at_zero() {
        let total = apply_discount(Decimal::from(20), CouponType::FixedAmount, Decimal::from(50));
        assert_eq!(total, Decimal::ZERO);
    }

    #[test]
    fn test_percentage_of_zero_total_stays_zero() {
        let total = apply_discount(Decimal::ZERO, CouponType::Percentage, Decimal::from(10));
        assert_eq!(total, Decimal::ZERO);
    }
}
