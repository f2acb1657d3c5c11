//! Domain models.
//!
//! These are the persisted shapes of each entity. Read-side view structs
//! (resolved product summaries and the like) live next to the route
//! handlers that serve them.

pub mod audit;
pub mod cart;
pub mod catalog;
pub mod coupon;
pub mod push;
pub mod user;
pub mod wishlist;

pub use audit::AuditLog;
pub use cart::{AppliedCoupon, Cart, CartLine};
pub use catalog::{Brand, Category, Product, SubCategory};
pub use coupon::{Coupon, UserEntitlement};
pub use push::PushSubscription;
pub use user::{Otp, User};
pub use wishlist::WishlistEntry;
