//! Periodic cart notifications over long-lived channels.
//!
//! Each open channel runs one loop: wait one interval, re-read the user's
//! cart in a fresh unit of work, and push a summary if the cart is not
//! empty. The loop ends when the client disconnects, when a poll or push
//! fails, or when the server shuts down. However it ends, the channel is
//! removed from the [`ConnectionManager`].

pub mod channel;
pub mod manager;

use std::time::Duration;

use thiserror::Error;
use tokio::time::{Instant, MissedTickBehavior};

use cartwheel_core::UserId;

pub use channel::{DuplexChannel, Inbound, PushError};
pub use manager::{ConnectionId, ConnectionManager, Registration};

use crate::config::NotificationConfig;
use crate::db::UnitOfWork;
use crate::services::cart::{CartService, CartServiceError};

/// Errors produced by the notification subsystem.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// Too many channels are open.
    #[error("notification capacity reached ({max} open channels)")]
    RegistryFull { max: usize },

    /// The server is shutting down and accepts no new channels.
    #[error("server is shutting down")]
    ShuttingDown,

    /// Reading the cart failed.
    #[error("cart poll failed: {0}")]
    Poll(#[source] CartServiceError),

    /// Sending the summary failed.
    #[error(transparent)]
    Push(#[from] PushError),
}

/// How a notification loop ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disconnect {
    /// The client closed the channel.
    Client,
    /// The server is shutting down.
    Shutdown,
}

/// Summary pushed for a nonempty cart.
#[must_use]
pub fn cart_summary(total_quantity: u64) -> String {
    format!("You have {total_quantity} items in your cart. Open the cart to proceed.")
}

/// Owns the channel registry and starts notification loops.
#[derive(Clone)]
pub struct NotificationHub {
    connections: ConnectionManager,
    uow: UnitOfWork,
    interval: Duration,
}

impl NotificationHub {
    /// Create a hub polling through `uow`.
    #[must_use]
    pub fn new(uow: UnitOfWork, config: &NotificationConfig) -> Self {
        Self {
            connections: ConnectionManager::new(config.max_connections),
            uow,
            interval: config.interval,
        }
    }

    /// Get a reference to the channel registry.
    #[must_use]
    pub const fn connections(&self) -> &ConnectionManager {
        &self.connections
    }

    /// Reserve a registry slot for a user before the channel is opened.
    ///
    /// # Errors
    ///
    /// Returns `NotificationError::RegistryFull` if the registry is at capacity,
    /// or `NotificationError::ShuttingDown` once [`Self::close_all`] has run.
    pub fn reserve(&self, user_id: UserId) -> Result<NotificationSession, NotificationError> {
        let registration = self.connections.register(user_id)?;
        Ok(NotificationSession {
            registration,
            uow: self.uow.clone(),
            interval: self.interval,
        })
    }

    /// Ask every open loop to stop and refuse new channels.
    pub fn close_all(&self) -> usize {
        let count = self.connections.close_all();
        if count > 0 {
            tracing::info!(count, "Closing notification channels");
        }
        count
    }
}

/// A reserved registry slot, ready to drive one channel.
pub struct NotificationSession {
    registration: Registration,
    uow: UnitOfWork,
    interval: Duration,
}

impl NotificationSession {
    /// Registry key of this session.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.registration.id()
    }

    /// Run the notification loop until the channel closes.
    ///
    /// The registry slot is released when this returns.
    ///
    /// # Errors
    ///
    /// Returns `NotificationError::Poll` or `NotificationError::Push` if a
    /// cycle fails; the loop does not retry.
    #[tracing::instrument(
        skip(self, channel),
        fields(connection_id = %self.registration.id(), user_id = %self.registration.user_id())
    )]
    pub async fn run<C: DuplexChannel>(mut self, mut channel: C) -> Result<Disconnect, NotificationError> {
        let user_id = self.registration.user_id();
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let cart = CartService::new(&self.uow)
                        .snapshot(user_id)
                        .await
                        .map_err(NotificationError::Poll)?;

                    if !cart.is_empty() {
                        channel.push_text(cart_summary(cart.total_quantity())).await?;
                    }
                }
                inbound = channel.next_inbound() => {
                    if inbound == Inbound::Closed {
                        tracing::debug!("Client closed notification channel");
                        return Ok(Disconnect::Client);
                    }
                }
                () = self.registration.closed() => {
                    channel.close().await;
                    return Ok(Disconnect::Shutdown);
                }
            }
        }
    }
}
