//! Database operations for the storefront `SQLite` store.
//!
//! ## Tables
//!
//! - `owner` - Catalog owners
//! - `company` - Companies, each referencing an owner by key
//! - `product` - Products, each referencing a company by key
//! - `users` - Accounts, each carrying its cart as a JSON text column
//!
//! References between catalog tables are plain text columns. They are not
//! enforced: a company may name an owner that no longer exists, and a cart
//! may hold a product key that was deleted.
//!
//! # Schema
//!
//! The schema is created idempotently at startup by [`init_schema`].
//!
//! # Transactions
//!
//! Every read and write goes through a [`UnitOfWork`] scope. Repositories
//! borrow the scope and never open transactions of their own.

pub mod catalog;
pub mod unit_of_work;
pub mod users;

use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

pub use catalog::{CatalogRecord, CatalogRepository};
pub use unit_of_work::{Scope, ScopeFuture, UnitOfWork};
pub use users::UserRepository;

/// Primary result codes `SQLITE_BUSY` and `SQLITE_LOCKED`.
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS owner (
    id   TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS company (
    id          TEXT PRIMARY KEY NOT NULL,
    title       TEXT NOT NULL,
    description TEXT NOT NULL,
    owner       TEXT NOT NULL,
    image       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS product (
    id          TEXT PRIMARY KEY NOT NULL,
    title       TEXT NOT NULL,
    description TEXT NOT NULL,
    company     TEXT NOT NULL,
    price       INTEGER NOT NULL,
    image       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    email           TEXT NOT NULL UNIQUE COLLATE NOCASE,
    hashed_password TEXT NOT NULL,
    is_active       INTEGER NOT NULL DEFAULT 1,
    is_superuser    INTEGER NOT NULL DEFAULT 0,
    is_verified     INTEGER NOT NULL DEFAULT 0,
    cart            TEXT NOT NULL DEFAULT '{}',
    cart_version    INTEGER NOT NULL DEFAULT 0
);
";

/// Repository error type.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(sqlx::Error),

    /// The store was busy or locked by another writer.
    #[error("store busy: {0}")]
    Busy(sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Whether retrying the whole transaction may succeed.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        matches!(self, Self::Busy(_))
    }
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        if is_busy_error(&err) {
            Self::Busy(err)
        } else {
            Self::Database(err)
        }
    }
}

/// `SQLite` reports extended result codes; the low byte is the primary code.
fn is_busy_error(err: &sqlx::Error) -> bool {
    let sqlx::Error::Database(db_err) = err else {
        return false;
    };

    db_err
        .code()
        .and_then(|code| code.parse::<i32>().ok())
        .is_some_and(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// Create a `SQLite` connection pool.
///
/// File databases are created if missing and opened in WAL mode. An
/// in-memory database lives only as long as its connection, so the pool is
/// pinned to a single connection that is never recycled.
///
/// # Arguments
///
/// * `database_url` - `SQLite` connection string (wrapped in `SecretString`)
/// * `max_connections` - Pool size for file databases
///
/// # Errors
///
/// Returns `sqlx::Error` if the URL is invalid or the connection cannot be established.
pub async fn create_pool(
    database_url: &SecretString,
    max_connections: u32,
) -> Result<SqlitePool, sqlx::Error> {
    let url = database_url.expose_secret();
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .busy_timeout(BUSY_TIMEOUT);

    if is_in_memory(url) {
        return SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await;
    }

    SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options.journal_mode(SqliteJournalMode::Wal))
        .await
}

/// Create all tables that do not exist yet.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a statement fails.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), RepositoryError> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    tracing::debug!("Store schema ready");
    Ok(())
}

/// Pool with the schema applied, backed by a private in-memory database.
#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) async fn test_pool() -> SqlitePool {
    let url = SecretString::from("sqlite::memory:");
    let pool = create_pool(&url, 1).await.unwrap();
    init_schema(&pool).await.unwrap();
    pool
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_is_in_memory() {
        assert!(is_in_memory("sqlite::memory:"));
        assert!(is_in_memory("sqlite://file:shared?mode=memory&cache=shared"));
        assert!(!is_in_memory("sqlite://cartwheel.db"));
    }

    #[test]
    fn test_non_database_errors_are_not_busy() {
        assert!(!RepositoryError::from(sqlx::Error::RowNotFound).is_busy());
        assert!(!RepositoryError::from(sqlx::Error::PoolTimedOut).is_busy());
    }

    #[tokio::test]
    async fn test_init_schema_is_idempotent() {
        let pool = test_pool().await;
        init_schema(&pool).await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name IN ('owner', 'company', 'product', 'users') ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        let names: Vec<_> = tables.into_iter().map(|(name,)| name).collect();
        assert_eq!(names, ["company", "owner", "product", "users"]);
    }

    #[tokio::test]
    async fn test_in_memory_pool_keeps_data_between_acquires() {
        let pool = test_pool().await;
        sqlx::query("INSERT INTO owner (id, name) VALUES ('o1', 'Ada')")
            .execute(&pool)
            .await
            .unwrap();

        let (name,): (String,) = sqlx::query_as("SELECT name FROM owner WHERE id = 'o1'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(name, "Ada");
    }
}
