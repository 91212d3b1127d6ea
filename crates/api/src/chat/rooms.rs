//! Room store
//!
//! Owns room metadata (membership, kind, linked ticket) and the ordered
//! message history per room. Rooms are created lazily via `get_or_create`
//! and never deleted here.

use std::collections::HashMap;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use fixchat_shared::{
    ChatError, ChatResult, Message, Participant, ReadReceipt, Room, RoomSeed,
};

struct RoomEntry {
    room: Room,
    messages: Vec<Message>,
}

/// In-memory store of rooms and their message histories
pub struct RoomStore {
    rooms: RwLock<HashMap<String, RoomEntry>>,
}

impl RoomStore {
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Return the room for `room_id`, creating it from `seed` if absent
    ///
    /// The creator is added to the participant set either way; a participant
    /// id appears at most once regardless of how often this is called.
    pub async fn get_or_create<F>(&self, room_id: &str, creator: &Participant, seed: F) -> Room
    where
        F: FnOnce() -> RoomSeed,
    {
        let mut rooms = self.rooms.write().await;
        let entry = rooms.entry(room_id.to_string()).or_insert_with(|| {
            let seed = seed();
            tracing::info!(room_id = %room_id, kind = ?seed.kind, "Room created");
            RoomEntry {
                room: Room {
                    id: room_id.to_string(),
                    name: seed.name,
                    kind: seed.kind,
                    participants: Vec::new(),
                    ticket_id: seed.ticket_id,
                    metadata: seed.metadata,
                    last_message: None,
                    unread_count: 0,
                    created_at: OffsetDateTime::now_utc(),
                },
                messages: Vec::new(),
            }
        });

        if !entry.room.participants.iter().any(|p| p.id == creator.id) {
            entry.room.participants.push(creator.clone());
            tracing::debug!(
                room_id = %room_id,
                user_id = %creator.id,
                room_size = entry.room.participants.len(),
                "Participant joined room"
            );
        }

        entry.room.clone()
    }

    /// Add a participant to an existing room's set; no duplicate insert
    pub async fn add_participant(&self, room_id: &str, participant: &Participant) -> ChatResult<Room> {
        let mut rooms = self.rooms.write().await;
        let entry = rooms
            .get_mut(room_id)
            .ok_or_else(|| ChatError::RoomNotFound(room_id.to_string()))?;

        if !entry
            .room
            .participants
            .iter()
            .any(|p| p.id == participant.id)
        {
            entry.room.participants.push(participant.clone());
        }
        Ok(entry.room.clone())
    }

    /// Remove a participant id from a room's set; no-op if absent
    pub async fn remove_participant(&self, room_id: &str, user_id: &Uuid) -> ChatResult<Room> {
        let mut rooms = self.rooms.write().await;
        let entry = rooms
            .get_mut(room_id)
            .ok_or_else(|| ChatError::RoomNotFound(room_id.to_string()))?;

        let before = entry.room.participants.len();
        entry.room.participants.retain(|p| p.id != *user_id);
        if entry.room.participants.len() < before {
            tracing::debug!(
                room_id = %room_id,
                user_id = %user_id,
                room_size = entry.room.participants.len(),
                "Participant left room"
            );
        }
        Ok(entry.room.clone())
    }

    /// Current room snapshot
    pub async fn get(&self, room_id: &str) -> ChatResult<Room> {
        let rooms = self.rooms.read().await;
        rooms
            .get(room_id)
            .map(|e| e.room.clone())
            .ok_or_else(|| ChatError::RoomNotFound(room_id.to_string()))
    }

    /// Append a message at the tail of the room's history
    ///
    /// Updates the room's last-message reference and unread counter.
    pub async fn append_message(&self, room_id: &str, message: Message) -> ChatResult<()> {
        let mut rooms = self.rooms.write().await;
        let entry = rooms
            .get_mut(room_id)
            .ok_or_else(|| ChatError::RoomNotFound(room_id.to_string()))?;

        entry.room.last_message = Some(Box::new(message.clone()));
        entry.room.unread_count += 1;
        entry.messages.push(message);
        Ok(())
    }

    /// The most recent `limit` messages in arrival order
    ///
    /// A snapshot of current state; calling again re-reads, it is not a
    /// frozen iterator.
    pub async fn history(&self, room_id: &str, limit: usize) -> ChatResult<Vec<Message>> {
        let rooms = self.rooms.read().await;
        let entry = rooms
            .get(room_id)
            .ok_or_else(|| ChatError::RoomNotFound(room_id.to_string()))?;

        let start = entry.messages.len().saturating_sub(limit);
        Ok(entry.messages[start..].to_vec())
    }

    /// Append a read receipt to a message unless the reader already has one
    ///
    /// Returns the new receipt, or None if the message id is unknown or the
    /// reader was already recorded (both are silent no-ops for the caller).
    pub async fn mark_read(
        &self,
        room_id: &str,
        message_id: &Uuid,
        reader_id: &Uuid,
    ) -> ChatResult<Option<ReadReceipt>> {
        let mut rooms = self.rooms.write().await;
        let entry = rooms
            .get_mut(room_id)
            .ok_or_else(|| ChatError::RoomNotFound(room_id.to_string()))?;

        let Some(message) = entry.messages.iter_mut().find(|m| m.id == *message_id) else {
            return Ok(None);
        };

        if message
            .metadata
            .read_by
            .iter()
            .any(|r| r.participant_id == *reader_id)
        {
            return Ok(None);
        }

        let receipt = ReadReceipt {
            participant_id: *reader_id,
            read_at: OffsetDateTime::now_utc(),
        };
        message.metadata.read_by.push(receipt.clone());
        Ok(Some(receipt))
    }

    /// Rooms the given user is currently a participant of
    pub async fn rooms_for(&self, user_id: &Uuid) -> Vec<Room> {
        let rooms = self.rooms.read().await;
        rooms
            .values()
            .filter(|e| e.room.participants.iter().any(|p| p.id == *user_id))
            .map(|e| e.room.clone())
            .collect()
    }

    /// Total number of rooms
    pub async fn room_count(&self) -> usize {
        let rooms = self.rooms.read().await;
        rooms.len()
    }
}

impl Default for RoomStore {
    fn default() -> Self {
        Self::new()
    }
}
