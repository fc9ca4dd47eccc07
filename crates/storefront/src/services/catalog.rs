//! Catalog service for owners, companies, and products.
//!
//! Every operation runs in its own unit of work. Payloads are validated
//! before a transaction is opened, and writes replace every mutable field.

use std::marker::PhantomData;

use thiserror::Error;

use crate::db::{CatalogRecord, CatalogRepository, RepositoryError, UnitOfWork};

/// Errors returned by catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The payload was well-formed but not acceptable.
    #[error("invalid {kind}: {message}")]
    Validation {
        kind: &'static str,
        message: String,
    },

    /// No row has the requested key.
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

fn not_found<R: CatalogRecord>(id: &R::Id) -> CatalogError {
    CatalogError::NotFound {
        kind: R::KIND,
        id: id.to_string(),
    }
}

/// Catalog operations for one record type.
pub struct CatalogService<'a, R> {
    uow: &'a UnitOfWork,
    _record: PhantomData<fn() -> R>,
}

impl<'a, R: CatalogRecord> CatalogService<'a, R> {
    /// Create a catalog service over a unit-of-work manager.
    #[must_use]
    pub const fn new(uow: &'a UnitOfWork) -> Self {
        Self {
            uow,
            _record: PhantomData,
        }
    }

    fn validate(payload: &R::Payload) -> Result<(), CatalogError> {
        R::validate(payload).map_err(|message| CatalogError::Validation {
            kind: R::KIND,
            message,
        })
    }

    /// List every record in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn list(&self) -> Result<Vec<R>, CatalogError> {
        self.uow
            .run_in_transaction(|scope| {
                Box::pin(async move { Ok(CatalogRepository::<R>::new(scope).list().await?) })
            })
            .await
    }

    /// Get a record by key.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if no record has this key.
    pub async fn get(&self, id: R::Id) -> Result<R, CatalogError> {
        self.uow
            .run_in_transaction(move |scope| {
                Box::pin(async move {
                    CatalogRepository::<R>::new(scope)
                        .get(&id)
                        .await?
                        .ok_or_else(|| not_found::<R>(&id))
                })
            })
            .await
    }

    /// Create a record under a freshly generated key.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` if the payload is rejected.
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn create(&self, payload: R::Payload) -> Result<R, CatalogError> {
        Self::validate(&payload)?;
        let id = R::generate_id();
        let record = R::from_payload(id.clone(), payload);

        let record = self
            .uow
            .run_in_transaction(move |scope| {
                Box::pin(async move {
                    CatalogRepository::<R>::new(scope).insert(&id, &record).await?;
                    Ok::<_, CatalogError>(record)
                })
            })
            .await?;

        tracing::info!(kind = R::KIND, "Catalog record created");
        Ok(record)
    }

    /// Replace every mutable field of an existing record.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` if the payload is rejected.
    /// Returns `CatalogError::NotFound` if no record has this key; nothing is written.
    pub async fn update(&self, id: R::Id, payload: R::Payload) -> Result<R, CatalogError> {
        Self::validate(&payload)?;
        let record = R::from_payload(id.clone(), payload);

        self.uow
            .run_in_transaction(move |scope| {
                Box::pin(async move {
                    match CatalogRepository::<R>::new(scope).update(&id, &record).await {
                        Ok(()) => Ok(record),
                        Err(RepositoryError::NotFound) => Err(not_found::<R>(&id)),
                        Err(e) => Err(e.into()),
                    }
                })
            })
            .await
    }

    /// Delete a record.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if no record has this key.
    pub async fn delete(&self, id: R::Id) -> Result<(), CatalogError> {
        self.uow
            .run_in_transaction(move |scope| {
                Box::pin(async move {
                    match CatalogRepository::<R>::new(scope).delete(&id).await {
                        Ok(()) => Ok(()),
                        Err(RepositoryError::NotFound) => Err(not_found::<R>(&id)),
                        Err(e) => Err(e.into()),
                    }
                })
            })
            .await?;

        tracing::info!(kind = R::KIND, "Catalog record deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;

    use cartwheel_core::{CompanyId, OwnerId, ProductId};

    use super::*;
    use crate::db::test_pool;
    use crate::models::{Owner, OwnerPayload, Product, ProductPayload};

    fn product(title: &str, price: i64) -> ProductPayload {
        ProductPayload {
            title: title.to_owned(),
            description: "desc".to_owned(),
            company: CompanyId::from("c1"),
            price,
            image: "img.png".to_owned(),
        }
    }

    #[tokio::test]
    async fn test_created_ids_are_unique() {
        let uow = UnitOfWork::new(test_pool().await);
        let owners = CatalogService::<Owner>::new(&uow);

        let mut ids = HashSet::new();
        for i in 0..20 {
            let owner = owners
                .create(OwnerPayload { name: format!("owner {i}") })
                .await
                .unwrap();
            assert!(ids.insert(owner.id));
        }
        assert_eq!(owners.list().await.unwrap().len(), 20);
    }

    #[tokio::test]
    async fn test_get_update_delete() {
        let uow = UnitOfWork::new(test_pool().await);
        let products = CatalogService::<Product>::new(&uow);

        let created = products.create(product("Mug", 5)).await.unwrap();
        assert_eq!(products.get(created.id.clone()).await.unwrap(), created);

        let updated = products
            .update(created.id.clone(), product("Big mug", 7))
            .await
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(products.get(created.id.clone()).await.unwrap().title, "Big mug");

        products.delete(created.id.clone()).await.unwrap();
        assert!(matches!(
            products.get(created.id).await,
            Err(CatalogError::NotFound { kind: "product", .. })
        ));
    }

    #[tokio::test]
    async fn test_update_missing_leaves_table_unchanged() {
        let uow = UnitOfWork::new(test_pool().await);
        let products = CatalogService::<Product>::new(&uow);
        let existing = products.create(product("Mug", 5)).await.unwrap();

        let result = products
            .update(ProductId::from("missing"), product("Ghost", 1))
            .await;
        assert!(matches!(result, Err(CatalogError::NotFound { .. })));
        assert_eq!(products.list().await.unwrap(), vec![existing]);
    }

    #[tokio::test]
    async fn test_negative_price_rejected() {
        let uow = UnitOfWork::new(test_pool().await);
        let products = CatalogService::<Product>::new(&uow);

        let result = products.create(product("Mug", -5)).await;
        assert!(matches!(result, Err(CatalogError::Validation { .. })));
        assert!(products.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let uow = UnitOfWork::new(test_pool().await);
        let owners = CatalogService::<Owner>::new(&uow);

        assert!(matches!(
            owners.delete(OwnerId::from("missing")).await,
            Err(CatalogError::NotFound { kind: "owner", .. })
        ));
    }
}
