//! Registry of open client connections.
//!
//! Each connection is represented by the sending half of an unbounded
//! channel; the per-socket writer task in [`super::handler`] owns the
//! receiving half and forwards frames to the socket.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::ws::Message;
use captioner_core::types::{ClientId, Timestamp};
use tokio::sync::{mpsc, RwLock};

struct ClientSlot {
    outbox: mpsc::UnboundedSender<Message>,
    opened_at: Timestamp,
}

/// Open connections keyed by [`ClientId`].
///
/// Shared behind an `Arc` by the socket handlers, the notifier delivery
/// task and the heartbeat.
#[derive(Default)]
pub struct WsManager {
    clients: RwLock<HashMap<ClientId, ClientSlot>>,
}

impl WsManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `client` and return the receiver its writer task drains.
    ///
    /// Registering an id twice replaces the earlier outbox.
    pub async fn add(&self, client: ClientId) -> mpsc::UnboundedReceiver<Message> {
        let (outbox, inbox) = mpsc::unbounded_channel();
        let slot = ClientSlot {
            outbox,
            opened_at: chrono::Utc::now(),
        };
        if self.clients.write().await.insert(client, slot).is_some() {
            tracing::warn!(client = %client, "Client id registered twice, replacing");
        }
        inbox
    }

    /// Deregister `client`. Returns `false` if it was not registered.
    pub async fn remove(&self, client: ClientId) -> bool {
        let Some(slot) = self.clients.write().await.remove(&client) else {
            return false;
        };
        let connected_secs = (chrono::Utc::now() - slot.opened_at).num_seconds();
        tracing::debug!(client = %client, connected_secs, "Connection deregistered");
        true
    }

    pub async fn contains(&self, client: ClientId) -> bool {
        self.clients.read().await.contains_key(&client)
    }

    /// Queue `message` for one client.
    ///
    /// Returns `false` when the client is unknown or its writer has exited.
    pub async fn send_to(&self, client: ClientId, message: Message) -> bool {
        self.clients
            .read()
            .await
            .get(&client)
            .is_some_and(|slot| slot.outbox.send(message).is_ok())
    }

    /// Queue `message` for every client and return how many accepted it.
    pub async fn broadcast(&self, message: Message) -> usize {
        fan_out(&*self.clients.read().await, || message.clone())
    }

    pub async fn connection_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Ping every client; used by the heartbeat.
    pub async fn ping_all(&self) -> usize {
        fan_out(&*self.clients.read().await, || Message::Ping(Bytes::new()))
    }

    /// Send Close to every client and forget them all.
    pub async fn shutdown_all(&self) {
        let mut clients = self.clients.write().await;
        let closed = fan_out(&clients, || Message::Close(None));
        clients.clear();
        tracing::info!(closed, "Closed all client connections");
    }
}

/// Writers that already exited are skipped; their handler deregisters them.
fn fan_out(
    clients: &HashMap<ClientId, ClientSlot>,
    mut message: impl FnMut() -> Message,
) -> usize {
    clients
        .values()
        .filter(|slot| slot.outbox.send(message()).is_ok())
        .count()
}
