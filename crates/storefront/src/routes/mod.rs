//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! # Public shop
//! GET  /s/{slug}                          - Shop page (HTML)
//! GET  /api/shops/{slug}                  - Shop, open round and products with stock
//! POST /api/shops/{slug}/orders           - Place an order
//!
//! # Order tracking (by tracking code)
//! GET  /api/orders/{code}                 - Order status and items
//! POST /api/orders/{code}/slip            - Upload payment slip (multipart `slip`)
//! GET  /api/orders/{code}/payment         - Bank details and PromptPay QR
//!
//! # Accounts
//! POST /api/auth/register                 - Create an owner account
//! POST /api/auth/verify-email             - Verify with a mailed token
//! POST /api/auth/resend-verification      - Mail a fresh verification link
//! POST /api/auth/login                    - Sign in
//! POST /api/auth/logout                   - Sign out
//! GET  /api/auth/me                       - Current owner
//! POST /api/auth/forgot-password          - Mail a reset link
//! POST /api/auth/reset-password           - Set a new password with a token
//! GET  /auth/verify?token=                - Verification link landing page
//! GET  /auth/reset-password?token=        - Reset form
//! POST /auth/reset-password               - Reset form submit
//!
//! # Owner dashboard (requires auth, scoped to the owner's shops)
//! GET/POST    /api/admin/shops
//! GET/PATCH   /api/admin/shops/{id}
//! GET/POST    /api/admin/products
//! PATCH/DELETE /api/admin/products/{id}
//! GET/POST    /api/admin/rounds
//! PATCH       /api/admin/rounds/{id}
//! GET         /api/admin/rounds/{id}/purchases
//! GET         /api/admin/rounds/{id}/stock
//! GET         /api/admin/rounds/{id}/finance
//! GET         /api/admin/orders?roundId=&status=
//! GET/PATCH   /api/admin/orders/{id}
//! GET/PUT     /api/admin/selection
//! POST        /api/admin/uploads
//! ```

pub mod admin;
pub mod auth;
pub mod orders;
pub mod shop;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// JSON account endpoints, rate limited per client IP.
pub fn auth_api_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/verify-email", post(auth::verify_email))
        .route("/resend-verification", post(auth::resend_verification))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
        .layer(auth_rate_limiter())
}

/// Pages reached from links in outgoing mail.
pub fn auth_page_routes() -> Router<AppState> {
    Router::new()
        .route("/verify", get(auth::verify_page))
        .route(
            "/reset-password",
            get(auth::reset_password_page).post(auth::reset_password_submit),
        )
        .layer(auth_rate_limiter())
}

/// Customer-facing JSON endpoints.
pub fn public_api_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/shops/{slug}", get(shop::show))
        .route("/shops/{slug}/orders", post(orders::place))
        .route("/orders/{code}", get(orders::track))
        .route(
            "/orders/{code}/slip",
            post(orders::upload_slip)
                .layer(DefaultBodyLimit::max(max_upload_bytes + MULTIPART_OVERHEAD)),
        )
        .route("/orders/{code}/payment", get(orders::payment))
        .layer(api_rate_limiter())
}

/// Owner dashboard endpoints.
pub fn admin_routes(max_upload_bytes: usize) -> Router<AppState> {
    admin::router().layer(DefaultBodyLimit::max(max_upload_bytes + MULTIPART_OVERHEAD))
}

/// Create all routes for the storefront.
pub fn routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/s/{slug}", get(shop::page))
        .nest("/auth", auth_page_routes())
        .nest("/api/auth", auth_api_routes())
        .nest("/api/admin", admin_routes(max_upload_bytes))
        .nest("/api", public_api_routes(max_upload_bytes))
}
