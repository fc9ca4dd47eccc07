//! Products.

use serde::{Deserialize, Serialize};

use cartwheel_core::{CompanyId, ProductId};

use crate::db::catalog::{BoundQuery, CatalogRecord};

/// A product offered by a company.
///
/// `price` is an integer amount in the smallest currency unit. `company` is
/// a plain reference and may name a missing company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub description: String,
    pub company: CompanyId,
    pub price: i64,
    pub image: String,
}

/// Body accepted when creating or replacing a product.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductPayload {
    pub title: String,
    pub description: String,
    pub company: CompanyId,
    pub price: i64,
    pub image: String,
}

impl CatalogRecord for Product {
    type Id = ProductId;
    type Payload = ProductPayload;

    const TABLE: &'static str = "product";
    const KIND: &'static str = "product";
    const FIELDS: &'static [&'static str] = &["title", "description", "company", "price", "image"];

    fn generate_id() -> ProductId {
        ProductId::generate()
    }

    fn from_payload(id: ProductId, payload: ProductPayload) -> Self {
        Self {
            id,
            title: payload.title,
            description: payload.description,
            company: payload.company,
            price: payload.price,
            image: payload.image,
        }
    }

    fn bind_fields<'q>(&self, query: BoundQuery<'q>) -> BoundQuery<'q> {
        query
            .bind(self.title.clone())
            .bind(self.description.clone())
            .bind(self.company.clone())
            .bind(self.price)
            .bind(self.image.clone())
    }

    fn validate(payload: &ProductPayload) -> Result<(), String> {
        if payload.price < 0 {
            return Err(format!("price must not be negative (got {})", payload.price));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn payload(price: i64) -> ProductPayload {
        ProductPayload {
            title: "Mug".to_owned(),
            description: "Ceramic".to_owned(),
            company: CompanyId::from("c1"),
            price,
            image: "mug.png".to_owned(),
        }
    }

    #[test]
    fn test_validate_price() {
        assert!(Product::validate(&payload(0)).is_ok());
        assert!(Product::validate(&payload(1250)).is_ok());
        assert!(Product::validate(&payload(-1)).is_err());
    }

    #[test]
    fn test_payload_ignores_client_id() {
        let payload: ProductPayload = serde_json::from_value(serde_json::json!({
            "id": "client-chosen",
            "title": "Mug",
            "description": "Ceramic",
            "company": "c1",
            "price": 5,
            "image": "mug.png"
        }))
        .unwrap();

        let product = Product::from_payload(ProductId::from("server"), payload);
        assert_eq!(product.id.as_str(), "server");
    }

    #[test]
    fn test_payload_requires_every_field() {
        let result = serde_json::from_value::<ProductPayload>(serde_json::json!({
            "title": "Mug",
            "price": 5
        }));
        assert!(result.is_err());
    }
}
