//! User domain types.
//!
//! These types represent validated domain objects separate from database row types.

use serde::Serialize;

use cartwheel_core::{Cart, Email, UserId};

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Login email, unique case-insensitively.
    pub email: Email,
    /// Inactive users cannot log in.
    pub is_active: bool,
    pub is_superuser: bool,
    pub is_verified: bool,
    /// Current cart contents.
    pub cart: Cart,
    /// Incremented on every cart write.
    pub cart_version: i64,
}

impl User {
    /// Outward representation, without internal bookkeeping.
    #[must_use]
    pub fn view(&self) -> UserView {
        UserView {
            id: self.id,
            email: self.email.clone(),
            is_active: self.is_active,
            is_superuser: self.is_superuser,
            is_verified: self.is_verified,
            cart: self.cart.clone(),
        }
    }
}

/// User as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserView {
    pub id: UserId,
    pub email: Email,
    pub is_active: bool,
    pub is_superuser: bool,
    pub is_verified: bool,
    pub cart: Cart,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            is_active: user.is_active,
            is_superuser: user.is_superuser,
            is_verified: user.is_verified,
            cart: user.cart,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_view_omits_version() {
        let user = User {
            id: UserId::new(3),
            email: Email::parse("ada@example.com").unwrap(),
            is_active: true,
            is_superuser: false,
            is_verified: false,
            cart: Cart::from_blob(r#"{"p1":2}"#).unwrap(),
            cart_version: 9,
        };

        let json = serde_json::to_value(user.view()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": 3,
                "email": "ada@example.com",
                "is_active": true,
                "is_superuser": false,
                "is_verified": false,
                "cart": {"p1": 2}
            })
        );
    }
}
