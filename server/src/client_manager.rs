//! Open connections and message fan-out
//!
//! Every admitted connection is represented here by the sending half of its
//! outbound queue, keyed by the player identity it was bound to. Presence in
//! this set is what makes a connection eligible for broadcasts.
//!
//! Delivery is fire-and-forget: a message is pushed onto each eligible queue
//! without waiting, and a queue whose writer has already gone away is
//! skipped. Queues are bounded; a connection that stops reading loses
//! messages once its queue fills. Nothing is buffered for later or retried.

use log::{debug, error, warn};
use shared::ServerMessage;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_tungstenite::tungstenite::Message;

/// Frames a connection may have waiting before new ones are dropped
pub const OUTBOUND_QUEUE_CAPACITY: usize = 1000;

/// A message produced by the game state, along with who should receive it.
#[derive(Debug, Clone, PartialEq)]
pub enum Outgoing {
    /// Private message to a single connection
    SendTo { id: u32, message: ServerMessage },
    /// Every open connection, optionally skipping the one that caused it
    Broadcast {
        message: ServerMessage,
        exclude: Option<u32>,
    },
}

impl Outgoing {
    /// The payload, regardless of who receives it
    pub fn message(&self) -> &ServerMessage {
        match self {
            Outgoing::SendTo { message, .. } | Outgoing::Broadcast { message, .. } => message,
        }
    }
}

#[derive(Default)]
pub struct ClientManager {
    /// Outbound queues indexed by player identity
    connections: HashMap<u32, mpsc::Sender<Message>>,
}

impl ClientManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection to the broadcast set under its player identity.
    ///
    /// Registering an identity twice replaces the earlier queue.
    pub fn register(&mut self, id: u32, sender: mpsc::Sender<Message>) {
        self.connections.insert(id, sender);
    }

    /// Drops a connection from the broadcast set. Returns true if it was present.
    ///
    /// Dropping the sender also ends the connection's writer task.
    pub fn unregister(&mut self, id: u32) -> bool {
        self.connections.remove(&id).is_some()
    }

    /// Delivers a message to its recipients and returns how many queues accepted it.
    pub fn dispatch(&self, outgoing: &Outgoing) -> usize {
        let text = match serde_json::to_string(outgoing.message()) {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to serialize outgoing message: {}", e);
                return 0;
            }
        };

        match outgoing {
            Outgoing::SendTo { id, .. } => usize::from(self.send_text(*id, &text)),
            Outgoing::Broadcast { exclude, .. } => self
                .connections
                .keys()
                .filter(|id| Some(**id) != *exclude)
                .filter(|id| self.send_text(**id, &text))
                .count(),
        }
    }

    fn send_text(&self, id: u32, text: &str) -> bool {
        let Some(sender) = self.connections.get(&id) else {
            return false;
        };

        match sender.try_send(Message::Text(text.to_owned())) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Outbound queue full for connection {}, dropping message", id);
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Skipping send to closed connection {}", id);
                false
            }
        }
    }

    /// Identities of every registered connection, in no particular order
    pub fn ids(&self) -> Vec<u32> {
        self.connections.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
