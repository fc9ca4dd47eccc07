//! Catalog repository shared by owners, companies, and products.
//!
//! The three catalog tables have the same shape: a server-generated text key
//! plus a fixed list of scalar columns. [`CatalogRecord`] describes one table
//! and [`CatalogRepository`] implements the row operations once for all of
//! them.

use std::fmt::Display;
use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{FromRow, Sqlite};

use super::{RepositoryError, Scope};

/// Query with positional arguments, as built by [`CatalogRecord::bind_fields`].
pub type BoundQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// A row type stored in one of the catalog tables.
pub trait CatalogRecord:
    for<'r> FromRow<'r, SqliteRow> + Serialize + Send + Sync + Unpin + 'static
{
    /// Key type of the table.
    type Id: Clone
        + Display
        + Send
        + Sync
        + sqlx::Type<Sqlite>
        + for<'q> sqlx::Encode<'q, Sqlite>
        + DeserializeOwned
        + 'static;

    /// Full-replace body accepted on create and update.
    type Payload: DeserializeOwned + Send + 'static;

    /// Table name.
    const TABLE: &'static str;

    /// Human-readable entity name used in errors and logs.
    const KIND: &'static str;

    /// Mutable columns, in the order [`Self::bind_fields`] binds them.
    const FIELDS: &'static [&'static str];

    /// Generate a fresh key for a new row.
    fn generate_id() -> Self::Id;

    /// Build a record from its key and a payload.
    fn from_payload(id: Self::Id, payload: Self::Payload) -> Self;

    /// Bind every mutable field, in [`Self::FIELDS`] order.
    fn bind_fields<'q>(&self, query: BoundQuery<'q>) -> BoundQuery<'q>;

    /// Reject payloads that are well-formed but not acceptable.
    ///
    /// # Errors
    ///
    /// Returns a message describing the rejected field.
    fn validate(_payload: &Self::Payload) -> Result<(), String> {
        Ok(())
    }
}

/// Repository for a catalog table, bound to a transactional scope.
pub struct CatalogRepository<'a, R> {
    scope: &'a mut Scope,
    _record: PhantomData<fn() -> R>,
}

impl<'a, R: CatalogRecord> CatalogRepository<'a, R> {
    /// Create a repository operating inside `scope`.
    #[must_use]
    pub fn new(scope: &'a mut Scope) -> Self {
        Self {
            scope,
            _record: PhantomData,
        }
    }

    fn select_sql() -> String {
        format!("SELECT id, {} FROM {}", R::FIELDS.join(", "), R::TABLE)
    }

    /// List every row in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&mut self) -> Result<Vec<R>, RepositoryError> {
        let sql = format!("{} ORDER BY rowid", Self::select_sql());
        let rows = sqlx::query_as::<_, R>(&sql)
            .fetch_all(self.scope.conn())
            .await?;
        Ok(rows)
    }

    /// Get a row by key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&mut self, id: &R::Id) -> Result<Option<R>, RepositoryError> {
        let sql = format!("{} WHERE id = ?", Self::select_sql());
        let row = sqlx::query_as::<_, R>(&sql)
            .bind(id.clone())
            .fetch_optional(self.scope.conn())
            .await?;
        Ok(row)
    }

    /// Insert a new row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the key already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn insert(&mut self, id: &R::Id, record: &R) -> Result<(), RepositoryError> {
        let placeholders = vec!["?"; R::FIELDS.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} (id, {}) VALUES (?, {placeholders})",
            R::TABLE,
            R::FIELDS.join(", ")
        );

        let query = sqlx::query(&sql).bind(id.clone());
        record
            .bind_fields(query)
            .execute(self.scope.conn())
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_unique_violation()
                {
                    return RepositoryError::Conflict(format!("{} {id} already exists", R::KIND));
                }
                RepositoryError::from(e)
            })?;

        Ok(())
    }

    /// Overwrite every mutable column of an existing row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no row has this key.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update(&mut self, id: &R::Id, record: &R) -> Result<(), RepositoryError> {
        let assignments = R::FIELDS
            .iter()
            .map(|field| format!("{field} = ?"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("UPDATE {} SET {assignments} WHERE id = ?", R::TABLE);

        let result = record
            .bind_fields(sqlx::query(&sql))
            .bind(id.clone())
            .execute(self.scope.conn())
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete a row by key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no row has this key.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&mut self, id: &R::Id) -> Result<(), RepositoryError> {
        let sql = format!("DELETE FROM {} WHERE id = ?", R::TABLE);
        let result = sqlx::query(&sql)
            .bind(id.clone())
            .execute(self.scope.conn())
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
