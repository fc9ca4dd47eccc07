//! Cart service.
//!
//! Each cart change is a read-modify-write of the user row: load the user
//! fresh, change the cart in memory, then write it back with
//! [`UserRepository::swap_cart`]. If another writer got there first the
//! swap matches no row, the scope rolls back, and the whole cycle runs
//! again from a fresh read. A busy store is retried the same way.
//!
//! Changes open their scope with the write lock already held, so writers
//! on separate connections queue on the store's busy timeout rather than
//! burning attempts on stale snapshots.

use thiserror::Error;

use cartwheel_core::{Cart, CartError, ProductId, UserId};

use crate::db::{RepositoryError, UnitOfWork, UserRepository};
use crate::models::User;

/// Read-modify-write cycles attempted before giving up.
pub const MAX_CART_ATTEMPTS: u32 = 8;

/// Errors returned by cart operations.
#[derive(Debug, Error)]
pub enum CartServiceError {
    /// The product is not in the cart.
    #[error("product {0} is not in the cart")]
    NotInCart(ProductId),

    /// The cart change is not allowed.
    #[error("invalid cart change: {0}")]
    Invalid(CartError),

    /// The user row no longer exists.
    #[error("user {0} not found")]
    UserNotFound(UserId),

    /// Another writer changed the cart between read and write.
    #[error("cart was modified concurrently")]
    VersionConflict,

    /// Every attempt lost to a concurrent writer.
    #[error("cart update abandoned after {attempts} conflicting attempts")]
    Conflict { attempts: u32 },

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl CartServiceError {
    const fn is_retryable(&self) -> bool {
        match self {
            Self::VersionConflict => true,
            Self::Repository(e) => e.is_busy(),
            _ => false,
        }
    }
}

impl From<CartError> for CartServiceError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::NotInCart(id) => Self::NotInCart(id),
            other => Self::Invalid(other),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum CartChange {
    Add,
    Remove,
}

impl CartChange {
    fn apply(self, cart: &mut Cart, product_id: ProductId) -> Result<(), CartError> {
        match self {
            Self::Add => cart.add(product_id).map(drop),
            Self::Remove => cart.remove(&product_id).map(drop),
        }
    }
}

/// Cart operations over the user row.
pub struct CartService<'a> {
    uow: &'a UnitOfWork,
}

impl<'a> CartService<'a> {
    /// Create a cart service over a unit-of-work manager.
    #[must_use]
    pub const fn new(uow: &'a UnitOfWork) -> Self {
        Self { uow }
    }

    /// Add one unit of a product to a user's cart.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::Invalid` if the quantity cannot grow.
    /// Returns `CartServiceError::Conflict` if every attempt lost to a concurrent writer.
    #[tracing::instrument(skip(self))]
    pub async fn add(&self, user_id: UserId, product_id: ProductId) -> Result<User, CartServiceError> {
        self.change(user_id, product_id, CartChange::Add).await
    }

    /// Remove one unit of a product from a user's cart.
    ///
    /// The product leaves the cart when its last unit is removed.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::NotInCart` if the product is absent; nothing is written.
    /// Returns `CartServiceError::Conflict` if every attempt lost to a concurrent writer.
    #[tracing::instrument(skip(self))]
    pub async fn remove(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<User, CartServiceError> {
        self.change(user_id, product_id, CartChange::Remove).await
    }

    /// Read a user's current cart.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError::UserNotFound` if the user row is gone.
    pub async fn snapshot(&self, user_id: UserId) -> Result<Cart, CartServiceError> {
        self.uow
            .run_in_transaction(move |scope| {
                Box::pin(async move {
                    UserRepository::new(scope)
                        .get_by_id(user_id)
                        .await?
                        .map(|user| user.cart)
                        .ok_or(CartServiceError::UserNotFound(user_id))
                })
            })
            .await
    }

    async fn change(
        &self,
        user_id: UserId,
        product_id: ProductId,
        change: CartChange,
    ) -> Result<User, CartServiceError> {
        for attempt in 1..=MAX_CART_ATTEMPTS {
            let product_id = product_id.clone();
            let outcome = self
                .uow
                .run_in_write_transaction(move |scope| {
                    Box::pin(async move {
                        let mut users = UserRepository::new(scope);
                        let mut user = users
                            .get_by_id(user_id)
                            .await?
                            .ok_or(CartServiceError::UserNotFound(user_id))?;

                        change.apply(&mut user.cart, product_id)?;

                        if !users.swap_cart(user.id, user.cart_version, &user.cart).await? {
                            return Err(CartServiceError::VersionConflict);
                        }
                        user.cart_version += 1;
                        Ok(user)
                    })
                })
                .await;

            match outcome {
                Err(e) if e.is_retryable() => {
                    tracing::debug!(attempt, error = %e, "Retrying cart update");
                    tokio::task::yield_now().await;
                }
                other => return other,
            }
        }

        tracing::warn!(%user_id, "Cart update abandoned after repeated conflicts");
        Err(CartServiceError::Conflict {
            attempts: MAX_CART_ATTEMPTS,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;
    use crate::db::{create_pool, init_schema, test_pool};

    async fn user(uow: &UnitOfWork) -> User {
        uow.run_in_transaction(|scope| {
            Box::pin(async move {
                let email = cartwheel_core::Email::parse("ada@example.com").unwrap();
                UserRepository::new(scope).create(&email, "hash").await
            })
        })
        .await
        .unwrap()
    }

    async fn blob(uow: &UnitOfWork, id: UserId) -> String {
        let (cart,): (String,) = sqlx::query_as("SELECT cart FROM users WHERE id = ?")
            .bind(id)
            .fetch_one(uow.pool())
            .await
            .unwrap();
        cart
    }

    fn pid(s: &str) -> ProductId {
        ProductId::from(s)
    }

    #[tokio::test]
    async fn test_add_then_remove_once_empties_cart() {
        let uow = UnitOfWork::new(test_pool().await);
        let user = user(&uow).await;
        let carts = CartService::new(&uow);

        let after_add = carts.add(user.id, pid("p1")).await.unwrap();
        assert_eq!(after_add.cart.quantity(&pid("p1")), Some(1));

        let after_remove = carts.remove(user.id, pid("p1")).await.unwrap();
        assert_eq!(after_remove.cart.quantity(&pid("p1")), None);
        assert_eq!(blob(&uow, user.id).await, "{}");
    }

    #[tokio::test]
    async fn test_add_twice_remove_once_leaves_one() {
        let uow = UnitOfWork::new(test_pool().await);
        let user = user(&uow).await;
        let carts = CartService::new(&uow);

        carts.add(user.id, pid("p1")).await.unwrap();
        carts.add(user.id, pid("p1")).await.unwrap();
        let refreshed = carts.remove(user.id, pid("p1")).await.unwrap();

        assert_eq!(refreshed.cart.quantity(&pid("p1")), Some(1));
        assert_eq!(refreshed.cart_version, 3);
        assert_eq!(blob(&uow, user.id).await, r#"{"p1":1}"#);
    }

    #[tokio::test]
    async fn test_remove_absent_writes_nothing() {
        let uow = UnitOfWork::new(test_pool().await);
        let user = user(&uow).await;
        let carts = CartService::new(&uow);
        carts.add(user.id, pid("p2")).await.unwrap();
        let before = blob(&uow, user.id).await;

        let err = carts.remove(user.id, pid("p1")).await.unwrap_err();
        assert!(matches!(err, CartServiceError::NotInCart(ref id) if *id == pid("p1")));
        assert_eq!(blob(&uow, user.id).await, before);
        assert_eq!(carts.snapshot(user.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_found() {
        let uow = UnitOfWork::new(test_pool().await);
        let carts = CartService::new(&uow);

        assert!(matches!(
            carts.add(UserId::new(404), pid("p1")).await,
            Err(CartServiceError::UserNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_adds_on_shared_connection() {
        let uow = UnitOfWork::new(test_pool().await);
        let user = user(&uow).await;
        let carts = CartService::new(&uow);
        carts.add(user.id, pid("p1")).await.unwrap();

        let (a, b) = tokio::join!(carts.add(user.id, pid("p1")), carts.add(user.id, pid("p1")));
        a.unwrap();
        b.unwrap();

        assert_eq!(carts.snapshot(user.id).await.unwrap().quantity(&pid("p1")), Some(3));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_on_separate_connections() {
        let path = std::env::temp_dir().join(format!("cartwheel-{}.db", uuid::Uuid::new_v4()));
        let url = SecretString::from(format!("sqlite://{}", path.display()));
        let pool = create_pool(&url, 10).await.unwrap();
        init_schema(&pool).await.unwrap();

        let uow = UnitOfWork::new(pool.clone());
        let user = user(&uow).await;

        let writers = MAX_CART_ATTEMPTS * 2;
        let tasks: Vec<_> = (0..writers)
            .map(|_| {
                let uow = uow.clone();
                tokio::spawn(async move { CartService::new(&uow).add(user.id, pid("p1")).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let cart = CartService::new(&uow).snapshot(user.id).await.unwrap();
        assert_eq!(cart.quantity(&pid("p1")), Some(writers));

        pool.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
        }
    }
}
