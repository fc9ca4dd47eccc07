//! Domain models for the storefront.
//!
//! Catalog records double as their row types; the user model is assembled
//! from a row after its email and cart blob are validated.

pub mod company;
pub mod owner;
pub mod product;
pub mod user;

pub use company::{Company, CompanyPayload};
pub use owner::{Owner, OwnerPayload};
pub use product::{Product, ProductPayload};
pub use user::{User, UserView};
