//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page (featured works)
//! GET  /browse                 - All items, `?category=` filter
//! GET  /brand.css              - Brand color stylesheet
//!
//! # Items
//! GET  /item/{id}              - Item detail, `?image=` gallery position
//! POST /item/{id}/purchase     - Start Stripe checkout (303 to Stripe)
//! POST /item/{id}/delete       - Delete (creator or admin)
//! GET  /create-item            - Create form
//! POST /create-item            - Create, generate description, remove image (multipart)
//! GET  /edit-item/{id}         - Edit form (creator or admin)
//! POST /edit-item/{id}         - Save or regenerate description
//!
//! # Account (requires identity)
//! GET  /settings               - Profile, artist mode, payment settings
//! POST /settings/artist        - Toggle artist mode
//! POST /settings/stripe        - Configure Stripe
//! POST /profile                - Save profile name
//!
//! # Admin (requires admin role)
//! GET  /admin                  - Dashboard
//! POST /admin/stripe           - Configure Stripe
//! POST /admin/branding         - Platform name, logo, color
//! POST /admin/fees             - Platform fee
//! POST /admin/roles            - Assign a role
//!
//! # Checkout return
//! GET  /payment-success        - `?session_id=` status lookup
//! GET  /payment-failure        - Cancelled checkout
//!
//! # Auth
//! GET  /auth/login             - Redirect to the identity provider
//! GET  /auth/callback          - Handle the provider callback
//! POST /auth/logout            - Logout action
//! ```

pub mod account;
pub mod admin;
pub mod auth;
pub mod brand;
pub mod home;
pub mod item_form;
pub mod items;
pub mod page;
pub mod payment;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login))
        .route("/callback", get(auth::callback))
        .route("/logout", post(auth::logout))
}

/// Create the item routes router.
pub fn item_routes() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(items::show))
        .route("/{id}/purchase", post(items::purchase))
        .route("/{id}/delete", post(items::delete))
}

/// Create the settings routes router.
pub fn settings_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::settings))
        .route("/artist", post(account::update_artist))
        .route("/stripe", post(account::update_stripe))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(admin::index))
        .route("/stripe", post(admin::update_stripe))
        .route("/branding", post(admin::update_branding))
        .route("/fees", post(admin::update_fees))
        .route("/roles", post(admin::assign_role))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/browse", get(home::browse))
        .route("/brand.css", get(brand::stylesheet))
        .nest("/item", item_routes())
        .route(
            "/create-item",
            get(item_form::new_item).post(item_form::create_item),
        )
        .route(
            "/edit-item/{id}",
            get(item_form::edit_item).post(item_form::update_item),
        )
        .nest("/settings", settings_routes())
        .route("/profile", post(account::save_profile))
        .nest("/admin", admin_routes())
        .route("/payment-success", get(payment::success))
        .route("/payment-failure", get(payment::failure))
        .nest("/auth", auth_routes())
}
