//! Registry of open notification channels.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::watch;
use uuid::Uuid;

use cartwheel_core::UserId;

use super::NotificationError;

/// Identifies one open notification channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

struct ConnectionHandle {
    user_id: UserId,
    shutdown: watch::Sender<bool>,
}

#[derive(Default)]
struct Registry {
    connections: HashMap<ConnectionId, ConnectionHandle>,
    /// Set by [`ConnectionManager::close_all`]; no registration succeeds afterwards.
    closing: bool,
}

/// Concurrency-safe registry of open channels, bounded in size.
///
/// Cheap to clone; clones share the same registry.
#[derive(Clone)]
pub struct ConnectionManager {
    registry: Arc<RwLock<Registry>>,
    max_connections: usize,
}

impl ConnectionManager {
    /// Create an empty registry admitting at most `max_connections` channels.
    #[must_use]
    pub fn new(max_connections: usize) -> Self {
        Self {
            registry: Arc::new(RwLock::new(Registry::default())),
            max_connections,
        }
    }

    /// Register a channel for `user_id`.
    ///
    /// The returned guard deregisters the channel when dropped.
    ///
    /// # Errors
    ///
    /// Returns `NotificationError::ShuttingDown` once [`Self::close_all`] has run.
    /// Returns `NotificationError::RegistryFull` if the registry is at capacity.
    pub fn register(&self, user_id: UserId) -> Result<Registration, NotificationError> {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let id = ConnectionId::generate();

        {
            let mut registry = self.write();
            if registry.closing {
                return Err(NotificationError::ShuttingDown);
            }
            if registry.connections.len() >= self.max_connections {
                return Err(NotificationError::RegistryFull {
                    max: self.max_connections,
                });
            }
            registry
                .connections
                .insert(id, ConnectionHandle { user_id, shutdown });
        }

        tracing::debug!(connection_id = %id, %user_id, "Notification channel registered");
        Ok(Registration {
            id,
            user_id,
            manager: self.clone(),
            shutdown: shutdown_rx,
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Registry> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Remove a channel from the registry.
    ///
    /// Returns `false` if it was not registered.
    pub fn deregister(&self, id: ConnectionId) -> bool {
        let removed = self.write().connections.remove(&id);

        if let Some(handle) = &removed {
            tracing::debug!(connection_id = %id, user_id = %handle.user_id, "Notification channel deregistered");
        }
        removed.is_some()
    }

    /// Whether a channel is currently registered.
    #[must_use]
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.read().connections.contains_key(&id)
    }

    /// Number of open channels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().connections.len()
    }

    /// Whether no channels are open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Signal every open channel to close and refuse new registrations.
    ///
    /// Channels deregister themselves as their loops exit. Returns the
    /// number of channels signalled.
    pub fn close_all(&self) -> usize {
        let mut registry = self.write();
        registry.closing = true;
        for handle in registry.connections.values() {
            handle.shutdown.send_replace(true);
        }
        registry.connections.len()
    }
}

/// Guard for a registered channel. Dropping it deregisters the channel.
pub struct Registration {
    id: ConnectionId,
    user_id: UserId,
    manager: ConnectionManager,
    shutdown: watch::Receiver<bool>,
}

impl Registration {
    /// Registry key of this channel.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// User the channel was opened for.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Resolves once the server asks this channel to close.
    pub async fn closed(&mut self) {
        // A dropped sender means the handle is gone from the registry.
        let _ = self.shutdown.wait_for(|closed| *closed).await;
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.manager.deregister(self.id);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_register_and_drop_deregisters() {
        let manager = ConnectionManager::new(4);
        let registration = manager.register(UserId::new(1)).unwrap();
        let id = registration.id();

        assert!(manager.contains(id));
        assert_eq!(manager.len(), 1);

        drop(registration);
        assert!(!manager.contains(id));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_registry_is_bounded() {
        let manager = ConnectionManager::new(2);
        let first = manager.register(UserId::new(1)).unwrap();
        let _second = manager.register(UserId::new(1)).unwrap();

        assert!(matches!(
            manager.register(UserId::new(2)),
            Err(NotificationError::RegistryFull { max: 2 })
        ));

        drop(first);
        assert!(manager.register(UserId::new(2)).is_ok());
    }

    #[test]
    fn test_explicit_deregister() {
        let manager = ConnectionManager::new(2);
        let registration = manager.register(UserId::new(1)).unwrap();

        assert!(manager.deregister(registration.id()));
        assert!(!manager.deregister(registration.id()));
        assert_eq!(manager.len(), 0);
    }

    #[tokio::test]
    async fn test_close_all_signals_every_channel() {
        let manager = ConnectionManager::new(8);
        let mut a = manager.register(UserId::new(1)).unwrap();
        let mut b = manager.register(UserId::new(2)).unwrap();

        assert_eq!(manager.close_all(), 2);

        tokio::time::timeout(Duration::from_secs(1), async {
            a.closed().await;
            b.closed().await;
        })
        .await
        .unwrap();
    }

    #[test]
    fn test_register_refused_after_close_all() {
        let manager = ConnectionManager::new(8);
        let _open = manager.register(UserId::new(1)).unwrap();

        assert_eq!(manager.close_all(), 1);
        assert!(matches!(
            manager.register(UserId::new(2)),
            Err(NotificationError::ShuttingDown)
        ));
        assert_eq!(manager.len(), 1);
    }

    #[tokio::test]
    async fn test_closed_returns_when_deregistered() {
        let manager = ConnectionManager::new(8);
        let mut registration = manager.register(UserId::new(1)).unwrap();
        manager.deregister(registration.id());

        tokio::time::timeout(Duration::from_secs(1), registration.closed())
            .await
            .unwrap();
    }
}
