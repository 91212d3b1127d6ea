//! WebSocket connection management
//!
//! Represents an active WebSocket connection with subscription tracking and
//! the authenticated-participant slot.

use std::collections::HashSet;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use fixchat_shared::Participant;

use super::events::ServerEvent;

/// Represents an active WebSocket connection
///
/// A connection starts unauthenticated; the participant slot is filled by the
/// gateway once the `authenticate` event has been handled.
#[derive(Debug)]
pub struct Connection {
    /// Unique session ID for this connection
    pub session_id: Uuid,

    /// Channel to send events to this connection
    pub sender: mpsc::UnboundedSender<ServerEvent>,

    /// Authenticated participant, if any
    participant: RwLock<Option<Participant>>,

    /// Set of room IDs this connection is subscribed to
    subscriptions: RwLock<HashSet<String>>,
}

impl Connection {
    /// Create a new, unauthenticated connection
    pub fn new(sender: mpsc::UnboundedSender<ServerEvent>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            sender,
            participant: RwLock::new(None),
            subscriptions: RwLock::new(HashSet::new()),
        }
    }

    /// Send an event to this connection
    ///
    /// Returns Ok(()) if sent successfully, Err if connection is closed
    #[allow(clippy::result_large_err)] // Error type is from tokio mpsc, containing the failed event
    pub fn send(&self, event: ServerEvent) -> Result<(), mpsc::error::SendError<ServerEvent>> {
        self.sender.send(event)
    }

    /// Fill the participant slot after a successful `authenticate`
    pub async fn set_participant(&self, participant: Participant) {
        let mut slot = self.participant.write().await;
        *slot = Some(participant);
    }

    /// Snapshot of the authenticated participant, None before `authenticate`
    pub async fn participant(&self) -> Option<Participant> {
        let slot = self.participant.read().await;
        slot.clone()
    }

    /// Subscribe to a room
    pub async fn subscribe(&self, room_id: &str) {
        let mut subs = self.subscriptions.write().await;
        subs.insert(room_id.to_string());
        tracing::debug!(
            session_id = %self.session_id,
            room_id = %room_id,
            "Subscribed to room"
        );
    }

    /// Unsubscribe from a room
    pub async fn unsubscribe(&self, room_id: &str) {
        let mut subs = self.subscriptions.write().await;
        subs.remove(room_id);
        tracing::debug!(
            session_id = %self.session_id,
            room_id = %room_id,
            "Unsubscribed from room"
        );
    }

    /// Check if subscribed to a room
    pub async fn is_subscribed(&self, room_id: &str) -> bool {
        let subs = self.subscriptions.read().await;
        subs.contains(room_id)
    }

    /// Get all room subscriptions
    pub async fn subscriptions(&self) -> HashSet<String> {
        let subs = self.subscriptions.read().await;
        subs.clone()
    }
}
