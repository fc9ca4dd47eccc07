//! User repository for database operations.
//!
//! Users carry their cart as a JSON text column plus a `cart_version`
//! counter. Cart writes go through [`UserRepository::swap_cart`], a
//! compare-and-swap on that counter, so a writer holding a stale snapshot
//! can never overwrite a newer cart.

use cartwheel_core::{Cart, Email, UserId};

use super::{RepositoryError, Scope};
use crate::models::User;

const USER_COLUMNS: &str =
    "id, email, hashed_password, is_active, is_superuser, is_verified, cart, cart_version";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    email: String,
    hashed_password: String,
    is_active: bool,
    is_superuser: bool,
    is_verified: bool,
    cart: Option<String>,
    cart_version: i64,
}

impl UserRow {
    fn into_user(self) -> Result<(User, String), RepositoryError> {
        let email = Email::parse(&self.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let cart = Cart::from_blob(self.cart.as_deref().unwrap_or_default()).map_err(|e| {
            RepositoryError::DataCorruption(format!("user {}: {e}", self.id))
        })?;

        let user = User {
            id: self.id,
            email,
            is_active: self.is_active,
            is_superuser: self.is_superuser,
            is_verified: self.is_verified,
            cart,
            cart_version: self.cart_version,
        };
        Ok((user, self.hashed_password))
    }
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    scope: &'a mut Scope,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository operating inside `scope`.
    #[must_use]
    pub const fn new(scope: &'a mut Scope) -> Self {
        Self { scope }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored email or cart is invalid.
    pub async fn get_by_id(&mut self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(self.scope.conn())
            .await?;

        row.map(|r| r.into_user().map(|(user, _)| user)).transpose()
    }

    /// Get a user and their password hash by email (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored email or cart is invalid.
    pub async fn get_with_password_by_email(
        &mut self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(email.clone())
            .fetch_optional(self.scope.conn())
            .await?;

        row.map(UserRow::into_user).transpose()
    }

    /// Create a new active, unverified, non-superuser account with an empty cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &mut self,
        email: &Email,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let sql = format!(
            "INSERT INTO users (email, hashed_password, is_active, is_superuser, is_verified, cart, cart_version) \
             VALUES (?, ?, 1, 0, 0, ?, 0) \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(email.clone())
            .bind(password_hash.to_owned())
            .bind(Cart::default().to_blob())
            .fetch_one(self.scope.conn())
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_unique_violation()
                {
                    return RepositoryError::Conflict("email already exists".to_owned());
                }
                RepositoryError::from(e)
            })?;

        row.into_user().map(|(user, _)| user)
    }

    /// Replace a user's cart if its version still equals `expected_version`.
    ///
    /// Returns `false` when another writer bumped the version first; nothing
    /// is written in that case.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Busy` if the store is locked by another writer.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn swap_cart(
        &mut self,
        id: UserId,
        expected_version: i64,
        cart: &Cart,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET cart = ?, cart_version = cart_version + 1 \
             WHERE id = ? AND cart_version = ?",
        )
        .bind(cart.to_blob())
        .bind(id)
        .bind(expected_version)
        .execute(self.scope.conn())
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
