//! Cartwheel Core - Shared domain types.
//!
//! This crate provides the types shared by the Cartwheel components:
//! - `storefront` - HTTP API, store access, and cart notifications
//! - `integration-tests` - End-to-end tests against a running storefront
//!
//! # Architecture
//!
//! The core crate contains only types and pure domain logic - no I/O, no
//! database access, no HTTP. The cart counter rules live here so they can be
//! tested without a store.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, emails, and the cart quantity map

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
