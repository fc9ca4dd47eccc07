//! Business logic services for the storefront.
//!
//! Each service borrows the shared [`UnitOfWork`](crate::db::UnitOfWork) and
//! opens one transactional scope per operation.
//!
//! # Services
//!
//! - `auth` - Registration, password login, and bearer tokens
//! - `catalog` - Owner, company, and product CRUD
//! - `cart` - Cart add/remove with optimistic concurrency

pub mod auth;
pub mod cart;
pub mod catalog;
