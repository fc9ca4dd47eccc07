//! Companies.

use serde::{Deserialize, Serialize};

use cartwheel_core::{CompanyId, OwnerId};

use crate::db::catalog::{BoundQuery, CatalogRecord};

/// A company. `owner` is a plain reference and may name a missing owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Company {
    pub id: CompanyId,
    pub title: String,
    pub description: String,
    pub owner: OwnerId,
    pub image: String,
}

/// Body accepted when creating or replacing a company.
#[derive(Debug, Clone, Deserialize)]
pub struct CompanyPayload {
    pub title: String,
    pub description: String,
    pub owner: OwnerId,
    pub image: String,
}

impl CatalogRecord for Company {
    type Id = CompanyId;
    type Payload = CompanyPayload;

    const TABLE: &'static str = "company";
    const KIND: &'static str = "company";
    const FIELDS: &'static [&'static str] = &["title", "description", "owner", "image"];

    fn generate_id() -> CompanyId {
        CompanyId::generate()
    }

    fn from_payload(id: CompanyId, payload: CompanyPayload) -> Self {
        Self {
            id,
            title: payload.title,
            description: payload.description,
            owner: payload.owner,
            image: payload.image,
        }
    }

    fn bind_fields<'q>(&self, query: BoundQuery<'q>) -> BoundQuery<'q> {
        query
            .bind(self.title.clone())
            .bind(self.description.clone())
            .bind(self.owner.clone())
            .bind(self.image.clone())
    }
}
