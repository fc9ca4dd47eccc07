//! Per-user cart: a counter set from product key to positive quantity.
//!
//! The cart is persisted as a text blob on the user row. [`Cart::to_blob`]
//! produces canonical JSON (keys in sorted order, no whitespace), so a cart
//! that has not changed always serializes to the same bytes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::id::ProductId;

/// Errors produced by cart operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    /// The product is not in the cart.
    #[error("product {0} is not in the cart")]
    NotInCart(ProductId),

    /// Incrementing would overflow the quantity counter.
    #[error("quantity for product {0} cannot grow any further")]
    QuantityOverflow(ProductId),

    /// The stored blob is not a valid cart.
    #[error("corrupt cart blob: {0}")]
    Corrupt(String),
}

/// Mapping from product key to quantity.
///
/// Quantities are always at least 1: removing the last unit of a product
/// deletes its key, so the map never holds zero.
///
/// # Example
///
/// ```
/// use cartwheel_core::{Cart, ProductId};
///
/// let mut cart = Cart::default();
/// let pid = ProductId::from("p1");
/// cart.add(pid.clone()).unwrap();
/// cart.add(pid.clone()).unwrap();
/// assert_eq!(cart.remove(&pid).unwrap(), Some(1));
/// assert_eq!(cart.to_blob(), r#"{"p1":1}"#);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart(BTreeMap<ProductId, u32>);

impl Cart {
    /// Parse a cart from its stored blob.
    ///
    /// An empty (or whitespace-only) blob is an empty cart.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Corrupt`] if the blob is not a JSON object of
    /// positive integer quantities.
    pub fn from_blob(blob: &str) -> Result<Self, CartError> {
        if blob.trim().is_empty() {
            return Ok(Self::default());
        }

        let items: BTreeMap<ProductId, u32> =
            serde_json::from_str(blob).map_err(|e| CartError::Corrupt(e.to_string()))?;

        if let Some((id, _)) = items.iter().find(|(_, qty)| **qty == 0) {
            return Err(CartError::Corrupt(format!("zero quantity for product {id}")));
        }

        Ok(Self(items))
    }

    /// Serialize the cart to its canonical blob form.
    #[must_use]
    pub fn to_blob(&self) -> String {
        // String keys and integer values always serialize.
        serde_json::to_string(&self.0).unwrap_or_default()
    }

    /// Add one unit of a product, returning the new quantity.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::QuantityOverflow`] if the quantity is already at
    /// its maximum.
    pub fn add(&mut self, id: ProductId) -> Result<u32, CartError> {
        let qty = self.0.entry(id.clone()).or_insert(0);
        *qty = qty
            .checked_add(1)
            .ok_or(CartError::QuantityOverflow(id))?;
        Ok(*qty)
    }

    /// Remove one unit of a product.
    ///
    /// Returns the remaining quantity, or `None` if the product left the cart.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotInCart`] if the product is absent; the cart is
    /// left untouched.
    pub fn remove(&mut self, id: &ProductId) -> Result<Option<u32>, CartError> {
        let qty = self
            .0
            .get_mut(id)
            .ok_or_else(|| CartError::NotInCart(id.clone()))?;

        if *qty <= 1 {
            self.0.remove(id);
            Ok(None)
        } else {
            *qty -= 1;
            Ok(Some(*qty))
        }
    }

    /// Quantity of a product, if present.
    #[must_use]
    pub fn quantity(&self, id: &ProductId) -> Option<u32> {
        self.0.get(id).copied()
    }

    /// Sum of all quantities.
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.0.values().map(|&qty| u64::from(qty)).sum()
    }

    /// Number of distinct products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the cart holds no products.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
