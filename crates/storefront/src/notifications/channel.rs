//! Duplex channel abstraction for the notification loop.

use std::future::Future;

use axum::extract::ws::{Message, WebSocket};
use thiserror::Error;

/// What the client sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound {
    /// The client closed the channel or the transport failed.
    Closed,
    /// Any other frame; ignored.
    Ignored,
}

/// A push could not be delivered.
#[derive(Debug, Error)]
#[error("push failed: {0}")]
pub struct PushError(pub String);

/// A long-lived bidirectional text channel to one client.
pub trait DuplexChannel: Send {
    /// Wait for the next frame from the client.
    fn next_inbound(&mut self) -> impl Future<Output = Inbound> + Send;

    /// Send a text frame to the client.
    fn push_text(&mut self, text: String) -> impl Future<Output = Result<(), PushError>> + Send;

    /// Close the channel from the server side. Errors are ignored.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

impl DuplexChannel for WebSocket {
    async fn next_inbound(&mut self) -> Inbound {
        match self.recv().await {
            None | Some(Err(_) | Ok(Message::Close(_))) => Inbound::Closed,
            Some(Ok(_)) => Inbound::Ignored,
        }
    }

    async fn push_text(&mut self, text: String) -> Result<(), PushError> {
        self.send(Message::Text(text.into()))
            .await
            .map_err(|e| PushError(e.to_string()))
    }

    async fn close(&mut self) {
        let _ = self.send(Message::Close(None)).await;
    }
}
