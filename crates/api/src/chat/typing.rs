//! Typing indicator tracking
//!
//! Ephemeral per-room set of display names currently flagged as typing.
//! Empty sets are discarded immediately so abandoned rooms leave nothing
//! behind. There is deliberately no per-participant reverse index; the
//! gateway iterates a connection's subscribed rooms at disconnect.

use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

/// Per-room typing sets
pub struct TypingTracker {
    typing: RwLock<HashMap<String, HashSet<String>>>,
}

impl TypingTracker {
    pub fn new() -> Self {
        Self {
            typing: RwLock::new(HashMap::new()),
        }
    }

    /// Add or remove a display name from a room's typing set
    ///
    /// When the set becomes empty the room entry is removed entirely.
    pub async fn set_typing(&self, room_id: &str, name: &str, is_typing: bool) {
        let mut typing = self.typing.write().await;
        if is_typing {
            typing
                .entry(room_id.to_string())
                .or_default()
                .insert(name.to_string());
        } else if let Some(names) = typing.get_mut(room_id) {
            names.remove(name);
            if names.is_empty() {
                typing.remove(room_id);
                tracing::debug!(room_id = %room_id, "Removed empty typing set");
            }
        }
    }

    /// Drop a participant's typing entry in one room; same as
    /// `set_typing(room, name, false)`
    pub async fn clear_participant(&self, room_id: &str, name: &str) {
        self.set_typing(room_id, name, false).await;
    }

    /// Names currently typing in a room
    pub async fn typing_in(&self, room_id: &str) -> Vec<String> {
        let typing = self.typing.read().await;
        typing
            .get(room_id)
            .map(|names| names.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of rooms with at least one typer
    pub async fn active_rooms(&self) -> usize {
        let typing = self.typing.read().await;
        typing.len()
    }
}

impl Default for TypingTracker {
    fn default() -> Self {
        Self::new()
    }
}
