//! Core types for Cartwheel.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod email;
pub mod id;

pub use cart::{Cart, CartError};
pub use email::{Email, EmailError};
pub use id::*;
