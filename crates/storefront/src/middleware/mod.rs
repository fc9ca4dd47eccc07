//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, transaction per route)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (record and echo `x-request-id`)
//!
//! Authentication is not a layer: handlers opt in with the [`BearerUser`]
//! or [`UpgradeUser`] extractor.

pub mod auth;
pub mod request_id;

pub use auth::{BearerUser, UpgradeUser};
pub use request_id::request_id_middleware;
