//! HTTP route handlers.
//!
//! # Route Structure (all under `/api/v1`)
//!
//! ```text
//! # Auth
//! POST /auth/signup                - Register, sends verification mail
//! GET  /auth/verify-email/{token}  - Verify an email address
//! POST /auth/sign-in               - Password sign-in, issues token pair
//! POST /auth/refresh-token         - Rotate the refresh token
//! POST /auth/forgot-password       - Send a password-reset code
//! POST /auth/reset-password        - Redeem a reset code
//!
//! # Users
//! GET/POST /users                  - Admin list/create
//! GET/PATCH/DELETE /users/me       - Self-service profile
//! GET/PATCH/DELETE /users/{id}     - Admin detail/update/delete
//!
//! # Catalog
//! GET/POST /categories             - List/create (create is admin)
//! GET/PATCH/DELETE /categories/{id}
//! GET/POST /sub-categories         + /{id}
//! GET/POST /brands                 + /{id}
//! GET/POST /products               + /{id}
//!
//! # Cart
//! POST   /cart                     - Add a product
//! GET    /cart                     - Fetch own cart
//! PATCH  /cart                     - Update a line (color/count)
//! POST   /cart/apply-coupon        - Apply a coupon code
//! DELETE /cart                     - Clear own cart
//! DELETE /cart/{productId}         - Remove one line
//! GET    /cart/admin               - Admin: all carts
//! GET    /cart/admin/{userId}      - Admin: one user's cart
//!
//! # Coupons (admin)
//! GET/POST /coupons                + GET/PATCH/DELETE /coupons/{id}
//!
//! # Wishlist
//! GET/POST /wishlist               + DELETE /wishlist/{productId}
//!
//! # Audit (admin)
//! GET /audit-logs
//!
//! # Push notifications
//! POST   /notifications/subscribe
//! DELETE /notifications/unsubscribe
//! POST   /notifications/send       - Admin broadcast
//! ```

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::state::AppState;

pub mod audit_logs;
pub mod auth;
pub mod brands;
pub mod cart;
pub mod categories;
pub mod coupons;
pub mod notifications;
pub mod products;
pub mod sub_categories;
pub mod users;
pub mod wishlist;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(auth::signup))
        .route("/verify-email/{token}", get(auth::verify_email))
        .route("/sign-in", post(auth::sign_in))
        .route("/refresh-token", post(auth::refresh_token))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
}

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(users::index).post(users::create))
        .route(
            "/me",
            get(users::me).patch(users::update_me).delete(users::delete_me),
        )
        .route(
            "/{id}",
            get(users::show).patch(users::update).delete(users::remove),
        )
}

/// Create the category routes router.
pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(categories::index).post(categories::create))
        .route(
            "/{id}",
            get(categories::show)
                .patch(categories::update)
                .delete(categories::remove),
        )
}

/// Create the sub-category routes router.
pub fn sub_category_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(sub_categories::index).post(sub_categories::create))
        .route(
            "/{id}",
            get(sub_categories::show)
                .patch(sub_categories::update)
                .delete(sub_categories::remove),
        )
}

/// Create the brand routes router.
pub fn brand_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(brands::index).post(brands::create))
        .route(
            "/{id}",
            get(brands::show).patch(brands::update).delete(brands::remove),
        )
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route(
            "/{id}",
            get(products::show)
                .patch(products::update)
                .delete(products::remove),
        )
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(cart::show).post(cart::add).patch(cart::update).delete(cart::clear),
        )
        .route("/apply-coupon", post(cart::apply_coupon))
        .route("/admin", get(cart::admin_index))
        .route("/admin/{user_id}", get(cart::admin_show))
        .route("/{product_id}", delete(cart::remove))
}

/// Create the coupon routes router.
pub fn coupon_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(coupons::index).post(coupons::create))
        .route(
            "/{id}",
            get(coupons::show)
                .patch(coupons::update)
                .delete(coupons::remove),
        )
}

/// Create the wishlist routes router.
pub fn wishlist_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(wishlist::index).post(wishlist::add))
        .route("/{product_id}", delete(wishlist::remove))
}

/// Create the audit log routes router.
pub fn audit_log_routes() -> Router<AppState> {
    Router::new().route("/", get(audit_logs::index))
}

/// Create the push notification routes router.
pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/subscribe", post(notifications::subscribe))
        .route("/unsubscribe", delete(notifications::unsubscribe))
        .route("/send", post(notifications::send))
}

/// Create all routes for the API, nested under `/api/v1`.
pub fn routes() -> Router<AppState> {
    let v1 = Router::new()
        .nest("/auth", auth_routes())
        .nest("/users", user_routes())
        .nest("/categories", category_routes())
        .nest("/sub-categories", sub_category_routes())
        .nest("/brands", brand_routes())
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .nest("/coupons", coupon_routes())
        .nest("/wishlist", wishlist_routes())
        .nest("/audit-logs", audit_log_routes())
        .nest("/notifications", notification_routes());

    Router::new().nest("/api/v1", v1)
}
