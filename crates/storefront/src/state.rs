//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::StorefrontConfig;
use crate::db::UnitOfWork;
use crate::notifications::NotificationHub;
use crate::services::auth::{AuthService, TokenKeys};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the unit-of-work manager and notification hub.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    uow: UnitOfWork,
    tokens: TokenKeys,
    notifications: NotificationHub,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `SQLite` connection pool with the schema applied
    #[must_use]
    pub fn new(config: &StorefrontConfig, pool: SqlitePool) -> Self {
        let uow = UnitOfWork::new(pool);
        let tokens = TokenKeys::new(&config.auth);
        let notifications = NotificationHub::new(uow.clone(), &config.notifications);

        Self {
            inner: Arc::new(AppStateInner {
                uow,
                tokens,
                notifications,
            }),
        }
    }

    /// Get a reference to the unit-of-work manager.
    #[must_use]
    pub fn uow(&self) -> &UnitOfWork {
        &self.inner.uow
    }

    /// Get a reference to the notification hub.
    #[must_use]
    pub fn notifications(&self) -> &NotificationHub {
        &self.inner.notifications
    }

    /// Authentication service bound to this state.
    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(&self.inner.uow, &self.inner.tokens)
    }
}
