//! Cart service behavior, driven through in-memory stores.
//!
//! Covers line mutations, coupon application (entitled and unlisted
//! users), deletion of emptied carts, and the optimistic-concurrency
//! retry, without touching a database.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use mercata_api::db::RepositoryError;
use mercata_api::models::{Cart, CartLine, Coupon, UserEntitlement};
use mercata_api::pricing::ProductPricing;
use mercata_api::services::cart::{
    CartError, CartService, CartStore, CouponLedger, ProductSource,
};
use mercata_core::{CartId, CouponId, CouponType, ProductId, UserId};

// =============================================================================
// In-memory doubles
// =============================================================================

#[derive(Default)]
struct MemCarts {
    carts: Mutex<HashMap<UserId, Cart>>,
    next_id: Mutex<i32>,
    /// When set, the next version-checked update loses the race once.
    drop_next_update: Mutex<bool>,
}

impl MemCarts {
    fn stored(&self, user_id: UserId) -> Option<Cart> {
        self.carts.lock().expect("lock").get(&user_id).cloned()
    }

    fn lose_next_race(&self) {
        *self.drop_next_update.lock().expect("lock") = true;
    }
}

impl CartStore for &MemCarts {
    async fn find_by_user(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        Ok(self.stored(user_id))
    }

    async fn insert(
        &self,
        user_id: UserId,
        items: &[CartLine],
        total_price: Decimal,
    ) -> Result<Cart, RepositoryError> {
        let mut carts = self.carts.lock().expect("lock");
        if carts.contains_key(&user_id) {
            return Err(RepositoryError::Conflict("cart already exists".to_owned()));
        }

        let mut next_id = self.next_id.lock().expect("lock");
        *next_id += 1;
        let now = Utc::now();
        let cart = Cart {
            id: CartId::new(*next_id),
            user_id,
            items: items.to_vec(),
            coupons: Vec::new(),
            total_price,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        carts.insert(user_id, cart.clone());
        Ok(cart)
    }

    async fn update(&self, cart: &Cart) -> Result<Option<Cart>, RepositoryError> {
        let mut drop_flag = self.drop_next_update.lock().expect("lock");
        if *drop_flag {
            *drop_flag = false;
            return Ok(None);
        }
        drop(drop_flag);

        let mut carts = self.carts.lock().expect("lock");
        let Some(stored) = carts.get_mut(&cart.user_id) else {
            return Ok(None);
        };
        if stored.version != cart.version {
            return Ok(None);
        }

        *stored = Cart {
            version: cart.version + 1,
            updated_at: Utc::now(),
            ..cart.clone()
        };
        Ok(Some(stored.clone()))
    }

    async fn delete(&self, id: CartId) -> Result<bool, RepositoryError> {
        let mut carts = self.carts.lock().expect("lock");
        let before = carts.len();
        carts.retain(|_, c| c.id != id);
        Ok(carts.len() < before)
    }

    async fn delete_by_user(&self, user_id: UserId) -> Result<bool, RepositoryError> {
        Ok(self.carts.lock().expect("lock").remove(&user_id).is_some())
    }
}

#[derive(Default)]
struct MemProducts {
    products: Mutex<Vec<ProductPricing>>,
}

impl MemProducts {
    fn with(products: Vec<ProductPricing>) -> Self {
        Self {
            products: Mutex::new(products),
        }
    }
}

impl ProductSource for &MemProducts {
    async fn pricing(&self, id: ProductId) -> Result<Option<ProductPricing>, RepositoryError> {
        Ok(self
            .products
            .lock()
            .expect("lock")
            .iter()
            .find(|p| p.id == id)
            .copied())
    }

    async fn pricing_many(
        &self,
        ids: &[ProductId],
    ) -> Result<Vec<ProductPricing>, RepositoryError> {
        let products = self.products.lock().expect("lock");
        Ok(products
            .iter()
            .filter(|p| ids.contains(&p.id))
            .copied()
            .collect())
    }
}

#[derive(Default)]
struct MemCoupons {
    coupons: Mutex<Vec<Coupon>>,
}

impl MemCoupons {
    fn with(coupons: Vec<Coupon>) -> Self {
        Self {
            coupons: Mutex::new(coupons),
        }
    }

    fn entitlements(&self, id: CouponId) -> Vec<UserEntitlement> {
        self.coupons
            .lock()
            .expect("lock")
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.users.clone())
            .unwrap_or_default()
    }
}

impl CouponLedger for &MemCoupons {
    async fn find_applicable(
        &self,
        code: &str,
        now: chrono::DateTime<Utc>,
    ) -> Result<Option<Coupon>, RepositoryError> {
        Ok(self
            .coupons
            .lock()
            .expect("lock")
            .iter()
            .find(|c| c.coupon_code == code && c.is_applicable_at(now))
            .cloned())
    }

    async fn update_entitlements(
        &self,
        id: CouponId,
        users: &[UserEntitlement],
    ) -> Result<(), RepositoryError> {
        let mut coupons = self.coupons.lock().expect("lock");
        let coupon = coupons
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(RepositoryError::NotFound)?;
        coupon.users = users.to_vec();
        Ok(())
    }
}

// =============================================================================
// Fixtures
// =============================================================================

const USER: UserId = UserId::new(1);

fn product(id: i32, price: i64, discounted: Option<i64>, stock: i32) -> ProductPricing {
    ProductPricing {
        id: ProductId::new(id),
        price: Decimal::from(price),
        price_after_discount: discounted.map(Decimal::from),
        quantity: stock,
    }
}

fn coupon(
    id: i32,
    code: &str,
    coupon_type: CouponType,
    amount: i64,
    users: Vec<UserEntitlement>,
) -> Coupon {
    let now = Utc::now();
    Coupon {
        id: CouponId::new(id),
        coupon_code: code.to_owned(),
        coupon_amount: Decimal::from(amount),
        coupon_type,
        start_date: now - Duration::days(1),
        end_date: now + Duration::days(1),
        is_enable: true,
        users,
        created_at: now,
        updated_at: now,
    }
}

fn entitlement(user_id: UserId, max_count: i32, usage_count: i32, disabled: bool) -> UserEntitlement {
    UserEntitlement {
        user_id,
        max_count,
        usage_count,
        disabled,
    }
}

// =============================================================================
// Line mutations
// =============================================================================

#[tokio::test]
async fn add_creates_cart_with_single_unit_line() {
    let carts = MemCarts::default();
    let products = MemProducts::with(vec![product(1, 100, None, 5)]);
    let coupons = MemCoupons::default();
    let service = CartService::new(&carts, &products, &coupons);

    let cart = service.add_line(USER, ProductId::new(1)).await.expect("add");

    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items.first().expect("line").quantity, 1);
    assert!(cart.items.first().expect("line").color.is_empty());
    assert_eq!(cart.total_price, Decimal::from(100));
}

#[tokio::test]
async fn add_same_product_twice_is_a_conflict() {
    let carts = MemCarts::default();
    let products = MemProducts::with(vec![product(1, 100, None, 5)]);
    let coupons = MemCoupons::default();
    let service = CartService::new(&carts, &products, &coupons);

    service.add_line(USER, ProductId::new(1)).await.expect("add");
    let err = service.add_line(USER, ProductId::new(1)).await.unwrap_err();

    assert!(matches!(err, CartError::ProductAlreadyInCart));
}

#[tokio::test]
async fn add_out_of_stock_never_creates_a_cart() {
    let carts = MemCarts::default();
    let products = MemProducts::with(vec![product(1, 100, None, 0)]);
    let coupons = MemCoupons::default();
    let service = CartService::new(&carts, &products, &coupons);

    let err = service.add_line(USER, ProductId::new(1)).await.unwrap_err();

    assert!(matches!(err, CartError::ProductOutOfStock));
    assert!(carts.stored(USER).is_none());
}

#[tokio::test]
async fn add_unknown_product_is_not_found() {
    let carts = MemCarts::default();
    let products = MemProducts::default();
    let coupons = MemCoupons::default();
    let service = CartService::new(&carts, &products, &coupons);

    let err = service.add_line(USER, ProductId::new(9)).await.unwrap_err();

    assert!(matches!(err, CartError::ProductNotFound));
}

#[tokio::test]
async fn discounted_price_drives_the_subtotal() {
    // price 100, discounted 80, quantity 2 -> 160
    let carts = MemCarts::default();
    let products = MemProducts::with(vec![product(1, 100, Some(80), 5)]);
    let coupons = MemCoupons::default();
    let service = CartService::new(&carts, &products, &coupons);

    service.add_line(USER, ProductId::new(1)).await.expect("add");
    let cart = service
        .update_line(USER, ProductId::new(1), None, Some(2))
        .await
        .expect("update");

    assert_eq!(cart.total_price, Decimal::from(160));
}

#[tokio::test]
async fn update_without_cart_falls_back_to_plain_add() {
    // Color and count supplied on this path are not honored.
    let carts = MemCarts::default();
    let products = MemProducts::with(vec![product(1, 100, None, 5)]);
    let coupons = MemCoupons::default();
    let service = CartService::new(&carts, &products, &coupons);

    let cart = service
        .update_line(USER, ProductId::new(1), Some("red"), Some(4))
        .await
        .expect("update");

    let line = cart.items.first().expect("line");
    assert_eq!(line.quantity, 1);
    assert!(line.color.is_empty());
}

#[tokio::test]
async fn update_missing_line_is_not_found() {
    let carts = MemCarts::default();
    let products = MemProducts::with(vec![product(1, 100, None, 5), product(2, 50, None, 5)]);
    let coupons = MemCoupons::default();
    let service = CartService::new(&carts, &products, &coupons);

    service.add_line(USER, ProductId::new(1)).await.expect("add");
    let err = service
        .update_line(USER, ProductId::new(2), None, Some(2))
        .await
        .unwrap_err();

    assert!(matches!(err, CartError::LineNotFound));
}

// =============================================================================
// Coupons
// =============================================================================

#[tokio::test]
async fn fixed_then_percentage_compound_in_application_order() {
    // 100 - 30 fixed = 70, then 10% of 70 -> 63 (not 10% of 100).
    let carts = MemCarts::default();
    let products = MemProducts::with(vec![product(1, 100, None, 5)]);
    let coupons = MemCoupons::with(vec![
        coupon(1, "111111", CouponType::FixedAmount, 30, Vec::new()),
        coupon(2, "222222", CouponType::Percentage, 10, Vec::new()),
    ]);
    let service = CartService::new(&carts, &products, &coupons);

    service.add_line(USER, ProductId::new(1)).await.expect("add");
    let cart = service
        .apply_coupon(USER, "111111", Utc::now())
        .await
        .expect("fixed");
    assert_eq!(cart.total_price, Decimal::from(70));

    let cart = service
        .apply_coupon(USER, "222222", Utc::now())
        .await
        .expect("percentage");
    assert_eq!(cart.total_price, Decimal::from(63));
    assert_eq!(cart.coupons.len(), 2);
}

#[tokio::test]
async fn discount_floors_at_zero() {
    let carts = MemCarts::default();
    let products = MemProducts::with(vec![product(1, 20, None, 5)]);
    let coupons = MemCoupons::with(vec![coupon(
        1,
        "111111",
        CouponType::FixedAmount,
        50,
        Vec::new(),
    )]);
    let service = CartService::new(&carts, &products, &coupons);

    service.add_line(USER, ProductId::new(1)).await.expect("add");
    let cart = service
        .apply_coupon(USER, "111111", Utc::now())
        .await
        .expect("apply");

    assert_eq!(cart.total_price, Decimal::ZERO);
}

#[tokio::test]
async fn unknown_or_lapsed_code_leaves_the_cart_untouched() {
    let carts = MemCarts::default();
    let products = MemProducts::with(vec![product(1, 100, None, 5)]);
    let mut lapsed = coupon(1, "111111", CouponType::FixedAmount, 30, Vec::new());
    lapsed.is_enable = false;
    let coupons = MemCoupons::with(vec![lapsed]);
    let service = CartService::new(&carts, &products, &coupons);

    service.add_line(USER, ProductId::new(1)).await.expect("add");

    let err = service
        .apply_coupon(USER, "111111", Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::CouponNotFound));

    let err = service
        .apply_coupon(USER, "999999", Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::CouponNotFound));

    let stored = carts.stored(USER).expect("cart");
    assert_eq!(stored.total_price, Decimal::from(100));
    assert!(stored.coupons.is_empty());
}

#[tokio::test]
async fn unlisted_user_cannot_apply_the_same_code_twice() {
    let carts = MemCarts::default();
    let products = MemProducts::with(vec![product(1, 100, None, 5)]);
    let coupons = MemCoupons::with(vec![coupon(
        1,
        "111111",
        CouponType::FixedAmount,
        10,
        Vec::new(),
    )]);
    let service = CartService::new(&carts, &products, &coupons);

    service.add_line(USER, ProductId::new(1)).await.expect("add");
    service
        .apply_coupon(USER, "111111", Utc::now())
        .await
        .expect("first");

    let err = service
        .apply_coupon(USER, "111111", Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::CouponAlreadyApplied));
}

#[tokio::test]
async fn exhausted_entitlement_is_rejected_without_touching_usage() {
    let carts = MemCarts::default();
    let products = MemProducts::with(vec![product(1, 100, None, 5)]);
    let coupons = MemCoupons::with(vec![coupon(
        1,
        "111111",
        CouponType::FixedAmount,
        10,
        vec![entitlement(USER, 2, 2, false)],
    )]);
    let service = CartService::new(&carts, &products, &coupons);

    service.add_line(USER, ProductId::new(1)).await.expect("add");
    let err = service
        .apply_coupon(USER, "111111", Utc::now())
        .await
        .unwrap_err();

    assert!(matches!(err, CartError::CouponLimitExceeded));
    let users = coupons.entitlements(CouponId::new(1));
    assert_eq!(users.first().expect("entitlement").usage_count, 2);
}

#[tokio::test]
async fn disabled_entitlement_is_rejected() {
    let carts = MemCarts::default();
    let products = MemProducts::with(vec![product(1, 100, None, 5)]);
    let coupons = MemCoupons::with(vec![coupon(
        1,
        "111111",
        CouponType::FixedAmount,
        10,
        vec![entitlement(USER, 5, 0, true)],
    )]);
    let service = CartService::new(&carts, &products, &coupons);

    service.add_line(USER, ProductId::new(1)).await.expect("add");
    let err = service
        .apply_coupon(USER, "111111", Utc::now())
        .await
        .unwrap_err();

    assert!(matches!(err, CartError::CouponDisabled));
}

#[tokio::test]
async fn entitled_user_usage_is_recorded_per_application() {
    // An entitlement has no duplicate-code guard: the cap alone limits it.
    let carts = MemCarts::default();
    let products = MemProducts::with(vec![product(1, 100, None, 5)]);
    let coupons = MemCoupons::with(vec![coupon(
        1,
        "111111",
        CouponType::FixedAmount,
        10,
        vec![entitlement(USER, 3, 0, false)],
    )]);
    let service = CartService::new(&carts, &products, &coupons);

    service.add_line(USER, ProductId::new(1)).await.expect("add");
    service
        .apply_coupon(USER, "111111", Utc::now())
        .await
        .expect("first");
    service
        .apply_coupon(USER, "111111", Utc::now())
        .await
        .expect("second");

    let users = coupons.entitlements(CouponId::new(1));
    assert_eq!(users.first().expect("entitlement").usage_count, 2);
}

// =============================================================================
// Removal and recompute semantics
// =============================================================================

#[tokio::test]
async fn removing_the_last_line_deletes_the_cart() {
    let carts = MemCarts::default();
    let products = MemProducts::with(vec![product(1, 100, None, 5)]);
    let coupons = MemCoupons::default();
    let service = CartService::new(&carts, &products, &coupons);

    service.add_line(USER, ProductId::new(1)).await.expect("add");
    let result = service
        .remove_line(USER, ProductId::new(1))
        .await
        .expect("remove");

    assert!(result.is_none());
    let err = service.get(USER).await.unwrap_err();
    assert!(matches!(err, CartError::CartNotFound));
}

#[tokio::test]
async fn removal_recomputes_from_lines_and_drops_coupon_effects() {
    // 100 + 50 = 150, minus fixed 30 -> 120. Removing the 50 line
    // recomputes from lines alone: 100, not 70.
    let carts = MemCarts::default();
    let products = MemProducts::with(vec![product(1, 100, None, 5), product(2, 50, None, 5)]);
    let coupons = MemCoupons::with(vec![coupon(
        1,
        "111111",
        CouponType::FixedAmount,
        30,
        Vec::new(),
    )]);
    let service = CartService::new(&carts, &products, &coupons);

    service.add_line(USER, ProductId::new(1)).await.expect("add 1");
    service.add_line(USER, ProductId::new(2)).await.expect("add 2");
    let cart = service
        .apply_coupon(USER, "111111", Utc::now())
        .await
        .expect("apply");
    assert_eq!(cart.total_price, Decimal::from(120));

    let cart = service
        .remove_line(USER, ProductId::new(2))
        .await
        .expect("remove")
        .expect("cart remains");

    assert_eq!(cart.total_price, Decimal::from(100));
    // The applied coupon is still listed even though its discount is gone.
    assert_eq!(cart.coupons.len(), 1);
}

#[tokio::test]
async fn color_only_update_preserves_the_discounted_total() {
    let carts = MemCarts::default();
    let products = MemProducts::with(vec![product(1, 100, None, 5)]);
    let coupons = MemCoupons::with(vec![coupon(
        1,
        "111111",
        CouponType::FixedAmount,
        30,
        Vec::new(),
    )]);
    let service = CartService::new(&carts, &products, &coupons);

    service.add_line(USER, ProductId::new(1)).await.expect("add");
    service
        .apply_coupon(USER, "111111", Utc::now())
        .await
        .expect("apply");

    let cart = service
        .update_line(USER, ProductId::new(1), Some("red"), None)
        .await
        .expect("color update");
    assert_eq!(cart.total_price, Decimal::from(70));
    assert_eq!(cart.items.first().expect("line").color, "red");

    // A quantity update recomputes from lines, resetting coupon effects.
    let cart = service
        .update_line(USER, ProductId::new(1), None, Some(2))
        .await
        .expect("count update");
    assert_eq!(cart.total_price, Decimal::from(200));
}

#[tokio::test]
async fn clear_requires_an_existing_cart() {
    let carts = MemCarts::default();
    let products = MemProducts::with(vec![product(1, 100, None, 5)]);
    let coupons = MemCoupons::default();
    let service = CartService::new(&carts, &products, &coupons);

    service.add_line(USER, ProductId::new(1)).await.expect("add");
    service.clear(USER).await.expect("clear");

    let err = service.clear(USER).await.unwrap_err();
    assert!(matches!(err, CartError::CartNotFound));
}

// =============================================================================
// Optimistic concurrency
// =============================================================================

#[tokio::test]
async fn a_single_lost_race_is_retried_transparently() {
    let carts = MemCarts::default();
    let products = MemProducts::with(vec![product(1, 100, None, 5), product(2, 50, None, 5)]);
    let coupons = MemCoupons::default();
    let service = CartService::new(&carts, &products, &coupons);

    service.add_line(USER, ProductId::new(1)).await.expect("add");

    carts.lose_next_race();
    let cart = service
        .add_line(USER, ProductId::new(2))
        .await
        .expect("retry succeeds");

    assert_eq!(cart.items.len(), 2);
    assert_eq!(cart.total_price, Decimal::from(150));
}
