//! Authentication service.
//!
//! Provides password registration, password login issuing bearer tokens,
//! and bearer token resolution.

mod error;
pub mod tokens;

pub use error::AuthError;
pub use tokens::TokenKeys;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use cartwheel_core::Email;

use crate::db::{RepositoryError, UnitOfWork, UserRepository};
use crate::models::User;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Authentication service.
///
/// Handles user registration, login, and bearer token resolution.
pub struct AuthService<'a> {
    uow: &'a UnitOfWork,
    tokens: &'a TokenKeys,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(uow: &'a UnitOfWork, tokens: &'a TokenKeys) -> Self {
        Self { uow, tokens }
    }

    /// Register a new user with email and password.
    ///
    /// Input is validated before the store is touched.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[tracing::instrument(skip(self, password))]
    pub async fn register(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let user = self
            .uow
            .run_in_transaction(move |scope| {
                Box::pin(async move {
                    UserRepository::new(scope)
                        .create(&email, &password_hash)
                        .await
                        .map_err(|e| match e {
                            RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                            other => AuthError::Repository(other),
                        })
                })
            })
            .await?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Check email and password, returning the user if they match.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong
    /// or the account is inactive.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .uow
            .run_in_transaction(move |scope| {
                Box::pin(async move {
                    UserRepository::new(scope)
                        .get_with_password_by_email(&email)
                        .await?
                        .ok_or(AuthError::InvalidCredentials)
                })
            })
            .await?;

        verify_password(password, &password_hash)?;

        if !user.is_active {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Login with email and password, issuing a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong
    /// or the account is inactive.
    #[tracing::instrument(skip(self, password))]
    pub async fn issue_token(&self, email: &str, password: &str) -> Result<String, AuthError> {
        let user = self.authenticate(email, password).await?;
        let token = self.tokens.issue(user.id)?;
        tracing::info!(user_id = %user.id, "Issued bearer token");
        Ok(token)
    }

    /// Resolve a bearer token to the user it was issued for.
    ///
    /// The token is verified before any store access. Inactive users are
    /// treated as unauthenticated.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unauthenticated` if the token is invalid or the
    /// user no longer exists.
    pub async fn resolve_bearer_token(&self, token: &str) -> Result<User, AuthError> {
        let user_id = self.tokens.verify(token)?;

        let user = self
            .uow
            .run_in_transaction(move |scope| {
                Box::pin(async move {
                    UserRepository::new(scope)
                        .get_by_id(user_id)
                        .await?
                        .ok_or(AuthError::Unauthenticated)
                })
            })
            .await?;

        if !user.is_active {
            return Err(AuthError::Unauthenticated);
        }

        Ok(user)
    }
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
