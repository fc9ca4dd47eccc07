//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! POST   /auth/jwt/login              - Exchange credentials for a bearer token
//! POST   /auth/jwt/logout             - Acknowledge logout (bearer)
//! POST   /auth/register               - Create an account
//!
//! GET    /users/me                    - Current user (bearer)
//!
//! POST   /add_to_bucket?product_id=   - Add one unit to the cart (bearer)
//! DELETE /remove_product?product_id=  - Remove one unit from the cart (bearer)
//!
//! GET    /products                    - List products
//! POST   /products                    - Create a product
//! GET    /products/{id}               - Product detail
//! PUT    /products/{id}               - Replace a product
//! DELETE /products/{id}               - Delete a product
//! ...    /companies, /owners          - Same shape as /products
//!
//! GET    /ws/{user_id}                - Cart notification channel (bearer)
//!
//! GET    /health                      - Liveness
//! GET    /health/ready                - Readiness (database reachable)
//! ```

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod health;
pub mod users;
pub mod ws;

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::models::{Company, Owner, Product};
use crate::state::AppState;

/// Create authentication routes.
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/jwt/login", post(auth::login))
        .route("/jwt/logout", post(auth::logout))
        .route("/register", post(auth::register))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Health
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        // Accounts
        .nest("/auth", auth_routes())
        .route("/users/me", get(users::me))
        // Cart
        .route("/add_to_bucket", post(cart::add_to_bucket))
        .route("/remove_product", delete(cart::remove_product))
        // Catalog
        .nest("/products", catalog::catalog_routes::<Product>())
        .nest("/companies", catalog::catalog_routes::<Company>())
        .nest("/owners", catalog::catalog_routes::<Owner>())
        // Notifications
        .route("/ws/{user_id}", get(ws::notifications))
}
