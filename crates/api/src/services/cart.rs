//! Cart service: the pricing and coupon-application core.
//!
//! Every mutation loads the caller's cart, validates against the catalog
//! and the coupon ledger, applies the change, recomputes the total through
//! `pricing`, and writes back with an optimistic version check. A lost race
//! is retried once from a fresh read before surfacing as a conflict.
//!
//! The service talks to storage through three narrow traits so the whole
//! flow runs against in-memory doubles in tests.

use chrono::{DateTime, Utc};
use thiserror::Error;

use mercata_core::{CartId, CouponId, ProductId, UserId};

use crate::db::RepositoryError;
use crate::db::carts::CartRepository;
use crate::db::coupons::CouponRepository;
use crate::db::products::ProductRepository;
use crate::models::{AppliedCoupon, Cart, CartLine, Coupon, UserEntitlement};
use crate::pricing::{self, ProductPricing};

/// Write attempts per operation: the initial one plus one retry after a
/// lost version race.
const WRITE_ATTEMPTS: u32 = 2;

/// Errors produced by cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("product not found")]
    ProductNotFound,

    #[error("product is out of stock")]
    ProductOutOfStock,

    /// One line per product: adding a product twice is a conflict, not a
    /// quantity merge.
    #[error("product already in cart")]
    ProductAlreadyInCart,

    #[error("product not found in cart")]
    LineNotFound,

    #[error("cart not found")]
    CartNotFound,

    /// Wrong code, disabled, or outside the validity window - the ledger
    /// does not say which.
    #[error("coupon not found or not valid")]
    CouponNotFound,

    #[error("coupon is disabled for this user")]
    CouponDisabled,

    #[error("coupon usage limit exceeded")]
    CouponLimitExceeded,

    #[error("coupon already used")]
    CouponAlreadyApplied,

    /// Both write attempts lost the version race.
    #[error("cart was modified concurrently")]
    ConcurrentModification,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Storage seam for the cart aggregate.
pub trait CartStore {
    async fn find_by_user(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError>;
    async fn insert(
        &self,
        user_id: UserId,
        items: &[CartLine],
        total_price: rust_decimal::Decimal,
    ) -> Result<Cart, RepositoryError>;
    /// Version-checked write; `None` means a concurrent writer won.
    async fn update(&self, cart: &Cart) -> Result<Option<Cart>, RepositoryError>;
    async fn delete(&self, id: CartId) -> Result<bool, RepositoryError>;
    async fn delete_by_user(&self, user_id: UserId) -> Result<bool, RepositoryError>;
}

/// Read-only catalog seam: price and stock per product.
pub trait ProductSource {
    async fn pricing(&self, id: ProductId) -> Result<Option<ProductPricing>, RepositoryError>;
    async fn pricing_many(
        &self,
        ids: &[ProductId],
    ) -> Result<Vec<ProductPricing>, RepositoryError>;
}

/// Coupon ledger seam: resolution and usage bookkeeping.
pub trait CouponLedger {
    /// Resolve a code only if enabled and inside its validity window.
    async fn find_applicable(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Coupon>, RepositoryError>;
    /// Persist an updated entitlement list.
    async fn update_entitlements(
        &self,
        id: CouponId,
        users: &[UserEntitlement],
    ) -> Result<(), RepositoryError>;
}

impl CartStore for CartRepository<'_> {
    async fn find_by_user(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        Self::find_by_user(self, user_id).await
    }

    async fn insert(
        &self,
        user_id: UserId,
        items: &[CartLine],
        total_price: rust_decimal::Decimal,
    ) -> Result<Cart, RepositoryError> {
        Self::insert(self, user_id, items, total_price).await
    }

    async fn update(&self, cart: &Cart) -> Result<Option<Cart>, RepositoryError> {
        Self::update(self, cart).await
    }

    async fn delete(&self, id: CartId) -> Result<bool, RepositoryError> {
        Self::delete(self, id).await
    }

    async fn delete_by_user(&self, user_id: UserId) -> Result<bool, RepositoryError> {
        Self::delete_by_user(self, user_id).await
    }
}

impl ProductSource for ProductRepository<'_> {
    async fn pricing(&self, id: ProductId) -> Result<Option<ProductPricing>, RepositoryError> {
        Self::pricing(self, id).await
    }

    async fn pricing_many(
        &self,
        ids: &[ProductId],
    ) -> Result<Vec<ProductPricing>, RepositoryError> {
        Self::pricing_many(self, ids).await
    }
}

impl CouponLedger for CouponRepository<'_> {
    async fn find_applicable(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Coupon>, RepositoryError> {
        Self::find_applicable(self, code, now).await
    }

    async fn update_entitlements(
        &self,
        id: CouponId,
        users: &[UserEntitlement],
    ) -> Result<(), RepositoryError> {
        Self::update_entitlements(self, id, users).await
    }
}

/// Cart operations for one storage backend.
pub struct CartService<S, P, L> {
    carts: S,
    products: P,
    coupons: L,
}

impl<S, P, L> CartService<S, P, L>
where
    S: CartStore,
    P: ProductSource,
    L: CouponLedger,
{
    /// Create a cart service over the given stores.
    pub const fn new(carts: S, products: P, coupons: L) -> Self {
        Self {
            carts,
            products,
            coupons,
        }
    }

    /// Add a product to the caller's cart, creating the cart if needed.
    ///
    /// The new line starts at quantity 1 with no color.
    ///
    /// # Errors
    ///
    /// `ProductNotFound` / `ProductOutOfStock` if the product cannot be
    /// added at all (no cart is created or touched in that case);
    /// `ProductAlreadyInCart` on a duplicate line.
    pub async fn add_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Cart, CartError> {
        let product = self
            .products
            .pricing(product_id)
            .await?
            .ok_or(CartError::ProductNotFound)?;
        if product.quantity <= 0 {
            return Err(CartError::ProductOutOfStock);
        }

        for _ in 0..WRITE_ATTEMPTS {
            match self.carts.find_by_user(user_id).await? {
                None => {
                    let items = [CartLine::new(product_id)];
                    let total = product.effective_price();
                    match self.carts.insert(user_id, &items, total).await {
                        Ok(cart) => return Ok(cart),
                        // Concurrent first add; reload and go through the
                        // existing-cart path.
                        Err(RepositoryError::Conflict(_)) => {}
                        Err(e) => return Err(e.into()),
                    }
                }
                Some(mut cart) => {
                    if cart.line_index(product_id).is_some() {
                        return Err(CartError::ProductAlreadyInCart);
                    }
                    cart.items.push(CartLine::new(product_id));
                    self.recompute(&mut cart).await?;

                    if let Some(stored) = self.carts.update(&cart).await? {
                        return Ok(stored);
                    }
                }
            }
        }

        Err(CartError::ConcurrentModification)
    }

    /// Update an existing line's color and/or quantity.
    ///
    /// Without a cart this behaves as [`Self::add_line`] for the product -
    /// the supplied color and quantity are not honored on that path. Color
    /// applies whenever supplied; only a supplied quantity triggers the
    /// subtotal recompute.
    ///
    /// # Errors
    ///
    /// `ProductNotFound` / `ProductOutOfStock` / `LineNotFound` per the
    /// checks above.
    pub async fn update_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        color: Option<&str>,
        quantity: Option<i32>,
    ) -> Result<Cart, CartError> {
        let product = self
            .products
            .pricing(product_id)
            .await?
            .ok_or(CartError::ProductNotFound)?;
        if product.quantity <= 0 {
            return Err(CartError::ProductOutOfStock);
        }

        for _ in 0..WRITE_ATTEMPTS {
            let Some(mut cart) = self.carts.find_by_user(user_id).await? else {
                return self.add_line(user_id, product_id).await;
            };

            let index = cart
                .line_index(product_id)
                .ok_or(CartError::LineNotFound)?;
            let line = cart.items.get_mut(index).ok_or(CartError::LineNotFound)?;

            if let Some(color) = color {
                line.color = color.to_owned();
            }
            if let Some(quantity) = quantity {
                line.quantity = quantity;
                self.recompute(&mut cart).await?;
            }

            if let Some(stored) = self.carts.update(&cart).await? {
                return Ok(stored);
            }
        }

        Err(CartError::ConcurrentModification)
    }

    /// Apply a coupon code to the caller's cart.
    ///
    /// Entitled users go through the ledger's disabled/limit checks and
    /// have their usage recorded; users without an entitlement are only
    /// guarded against applying the same code to this cart twice. The
    /// discount is subtracted from the current total and floored at zero.
    ///
    /// # Errors
    ///
    /// `CartNotFound`, `CouponNotFound`, `CouponDisabled`,
    /// `CouponLimitExceeded`, or `CouponAlreadyApplied` per the rules
    /// above.
    pub async fn apply_coupon(
        &self,
        user_id: UserId,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Cart, CartError> {
        // The ledger increment must happen exactly once even when the cart
        // write retries after a lost version race.
        let mut usage_recorded = false;

        for _ in 0..WRITE_ATTEMPTS {
            let mut cart = self
                .carts
                .find_by_user(user_id)
                .await?
                .ok_or(CartError::CartNotFound)?;

            let coupon = self
                .coupons
                .find_applicable(code, now)
                .await?
                .ok_or(CartError::CouponNotFound)?;

            match coupon.entitlement_for(user_id) {
                Some(entitlement) => {
                    if entitlement.disabled {
                        return Err(CartError::CouponDisabled);
                    }
                    if entitlement.usage_count >= entitlement.max_count {
                        return Err(CartError::CouponLimitExceeded);
                    }

                    if !usage_recorded {
                        let mut users = coupon.users.clone();
                        if let Some(e) = users.iter_mut().find(|e| e.user_id == user_id) {
                            e.usage_count += 1;
                        }
                        self.coupons.update_entitlements(coupon.id, &users).await?;
                        usage_recorded = true;
                    }
                }
                None => {
                    if cart.has_coupon_code(code) {
                        return Err(CartError::CouponAlreadyApplied);
                    }
                }
            }

            cart.coupons.push(AppliedCoupon {
                coupon_code: code.to_owned(),
                coupon_id: coupon.id,
            });
            cart.total_price = pricing::apply_discount(
                cart.total_price,
                coupon.coupon_type,
                coupon.coupon_amount,
            );

            if let Some(stored) = self.carts.update(&cart).await? {
                return Ok(stored);
            }
        }

        Err(CartError::ConcurrentModification)
    }

    /// Remove a line. Deletes the cart when its last line goes, in which
    /// case `None` is returned.
    ///
    /// The total is recomputed from the remaining lines only; discounts of
    /// already-applied coupons are not re-derived.
    ///
    /// # Errors
    ///
    /// `CartNotFound` / `LineNotFound` per the checks above.
    pub async fn remove_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<Cart>, CartError> {
        for _ in 0..WRITE_ATTEMPTS {
            let mut cart = self
                .carts
                .find_by_user(user_id)
                .await?
                .ok_or(CartError::CartNotFound)?;

            let index = cart
                .line_index(product_id)
                .ok_or(CartError::LineNotFound)?;
            cart.items.remove(index);

            if cart.items.is_empty() {
                self.carts.delete(cart.id).await?;
                return Ok(None);
            }

            self.recompute(&mut cart).await?;

            if let Some(stored) = self.carts.update(&cart).await? {
                return Ok(Some(stored));
            }
        }

        Err(CartError::ConcurrentModification)
    }

    /// Drop the caller's cart outright.
    ///
    /// # Errors
    ///
    /// `CartNotFound` if there is nothing to clear.
    pub async fn clear(&self, user_id: UserId) -> Result<(), CartError> {
        if self.carts.delete_by_user(user_id).await? {
            Ok(())
        } else {
            Err(CartError::CartNotFound)
        }
    }

    /// The caller's cart.
    ///
    /// # Errors
    ///
    /// `CartNotFound` if none exists.
    pub async fn get(&self, user_id: UserId) -> Result<Cart, CartError> {
        self.carts
            .find_by_user(user_id)
            .await?
            .ok_or(CartError::CartNotFound)
    }

    /// Recompute the cart's subtotal from its lines.
    async fn recompute(&self, cart: &mut Cart) -> Result<(), CartError> {
        let ids: Vec<ProductId> = cart.items.iter().map(|l| l.product_id).collect();
        let resolved = self.products.pricing_many(&ids).await?;
        cart.total_price = pricing::recompute_subtotal(&cart.items, &resolved);
        Ok(())
    }
}
