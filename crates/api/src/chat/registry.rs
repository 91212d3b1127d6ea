//! Participant registry
//!
//! Tracks identity, presence and the live connection handle per user.
//! Authoritative for presence; the gateway is responsible for broadcasting
//! presence changes.

use std::collections::HashMap;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use fixchat_shared::{Participant, PresenceStatus};

use super::connection::Connection;

struct Entry {
    participant: Participant,
    connection: Option<Arc<Connection>>,
}

/// Registry of every participant ever seen, keyed by user id
///
/// Two connections for the same user id replace the prior socket association
/// (last-connect-wins). Participants are never deleted, only marked offline.
pub struct ParticipantRegistry {
    entries: RwLock<HashMap<Uuid, Entry>>,
}

impl ParticipantRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Store or overwrite the mapping from a user id to a live connection
    /// and presence record
    pub async fn register(&self, conn: Arc<Connection>, participant: Participant) {
        let mut entries = self.entries.write().await;
        let user_id = participant.id;
        let replaced = entries
            .insert(
                user_id,
                Entry {
                    participant,
                    connection: Some(conn),
                },
            )
            .is_some();

        tracing::info!(
            user_id = %user_id,
            replaced = replaced,
            registered = entries.len(),
            "Participant registered"
        );
    }

    /// Flip presence to offline and stamp last-seen; idempotent
    pub async fn mark_offline(&self, user_id: &Uuid) {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get_mut(user_id) {
            entry.participant.status = PresenceStatus::Offline;
            entry.participant.last_seen = OffsetDateTime::now_utc();
            entry.connection = None;

            tracing::info!(user_id = %user_id, "Participant marked offline");
        }
    }

    /// Update a participant's presence status without touching the connection
    pub async fn set_status(&self, user_id: &Uuid, status: PresenceStatus) {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get_mut(user_id) {
            entry.participant.status = status;
            entry.participant.last_seen = OffsetDateTime::now_utc();
        }
    }

    /// Current participant record for a user id
    pub async fn lookup(&self, user_id: &Uuid) -> Option<Participant> {
        let entries = self.entries.read().await;
        entries.get(user_id).map(|e| e.participant.clone())
    }

    /// Live connection for a user id, if any
    pub async fn connection_for(&self, user_id: &Uuid) -> Option<Arc<Connection>> {
        let entries = self.entries.read().await;
        entries.get(user_id).and_then(|e| e.connection.clone())
    }

    /// Snapshot of currently-online participants for presence broadcast
    pub async fn all_online(&self) -> Vec<Participant> {
        let entries = self.entries.read().await;
        entries
            .values()
            .filter(|e| e.participant.status == PresenceStatus::Online)
            .map(|e| e.participant.clone())
            .collect()
    }

    /// Whether the user currently has a live connection and is not offline
    pub async fn is_online(&self, user_id: &Uuid) -> bool {
        let entries = self.entries.read().await;
        entries
            .get(user_id)
            .map(|e| e.connection.is_some() && e.participant.status != PresenceStatus::Offline)
            .unwrap_or(false)
    }
}

impl Default for ParticipantRegistry {
    fn default() -> Self {
        Self::new()
    }
}
