//! Transactional scopes.
//!
//! A [`UnitOfWork`] runs one logical operation inside one store transaction:
//!
//! ```rust,ignore
//! let user = uow
//!     .run_in_transaction(move |scope| {
//!         Box::pin(async move {
//!             UserRepository::new(scope)
//!                 .get_by_id(user_id)
//!                 .await?
//!                 .ok_or(RepositoryError::NotFound)
//!         })
//!     })
//!     .await?;
//! ```
//!
//! The operation receives a `&mut Scope`. Everything it does through that
//! handle commits together when it returns `Ok`, or is rolled back together
//! when it returns `Err`. Operations capture owned values only, since the
//! future they return borrows nothing but the scope.

use std::future::Future;
use std::pin::Pin;

use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};

use super::RepositoryError;

/// Future returned by an operation run inside a [`Scope`].
pub type ScopeFuture<'s, T> = Pin<Box<dyn Future<Output = T> + Send + 's>>;

/// Handle to the transaction of the running unit of work.
///
/// Repositories borrow the scope, so every repository used during one
/// operation shares the same transaction.
pub struct Scope {
    tx: Transaction<'static, Sqlite>,
}

impl Scope {
    /// Connection bound to the active transaction.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }
}

/// Opens transactional scopes against the store.
#[derive(Clone)]
pub struct UnitOfWork {
    pool: SqlitePool,
}

impl UnitOfWork {
    /// Create a unit-of-work manager over a connection pool.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run `operation` inside a fresh transaction.
    ///
    /// Commits when the operation returns `Ok` and rolls back when it
    /// returns `Err`. Exactly one of the two happens per call.
    ///
    /// # Errors
    ///
    /// Returns the operation's error, or a `RepositoryError` (converted into
    /// `E`) if the transaction cannot be opened or committed.
    pub async fn run_in_transaction<T, E, F>(&self, operation: F) -> Result<T, E>
    where
        F: for<'s> FnOnce(&'s mut Scope) -> ScopeFuture<'s, Result<T, E>> + Send,
        T: Send,
        E: From<RepositoryError> + Send,
    {
        let tx = self.pool.begin().await.map_err(RepositoryError::from)?;
        Self::finish(Scope { tx }, operation).await
    }

    /// Like [`run_in_transaction`](Self::run_in_transaction), but takes the
    /// store's write lock when the transaction opens (`BEGIN IMMEDIATE`).
    ///
    /// Competing writers wait on the pool's busy timeout instead of failing
    /// when a read snapshot cannot be upgraded to a write.
    ///
    /// # Errors
    ///
    /// Same as [`run_in_transaction`](Self::run_in_transaction).
    pub async fn run_in_write_transaction<T, E, F>(&self, operation: F) -> Result<T, E>
    where
        F: for<'s> FnOnce(&'s mut Scope) -> ScopeFuture<'s, Result<T, E>> + Send,
        T: Send,
        E: From<RepositoryError> + Send,
    {
        let tx = self
            .pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(RepositoryError::from)?;
        Self::finish(Scope { tx }, operation).await
    }

    async fn finish<T, E, F>(mut scope: Scope, operation: F) -> Result<T, E>
    where
        F: for<'s> FnOnce(&'s mut Scope) -> ScopeFuture<'s, Result<T, E>> + Send,
        T: Send,
        E: From<RepositoryError> + Send,
    {

        match operation(&mut scope).await {
            Ok(value) => {
                scope.tx.commit().await.map_err(RepositoryError::from)?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = scope.tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "Transaction rollback failed");
                }
                Err(err)
            }
        }
    }
}
