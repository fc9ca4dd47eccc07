//! Catalog owners.

use serde::{Deserialize, Serialize};

use cartwheel_core::OwnerId;

use crate::db::catalog::{BoundQuery, CatalogRecord};

/// An owner of one or more companies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Owner {
    pub id: OwnerId,
    pub name: String,
}

/// Body accepted when creating or replacing an owner.
#[derive(Debug, Clone, Deserialize)]
pub struct OwnerPayload {
    pub name: String,
}

impl CatalogRecord for Owner {
    type Id = OwnerId;
    type Payload = OwnerPayload;

    const TABLE: &'static str = "owner";
    const KIND: &'static str = "owner";
    const FIELDS: &'static [&'static str] = &["name"];

    fn generate_id() -> OwnerId {
        OwnerId::generate()
    }

    fn from_payload(id: OwnerId, payload: OwnerPayload) -> Self {
        Self {
            id,
            name: payload.name,
        }
    }

    fn bind_fields<'q>(&self, query: BoundQuery<'q>) -> BoundQuery<'q> {
        query.bind(self.name.clone())
    }
}
