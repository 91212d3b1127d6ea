//! Global chat coordinator state
//!
//! Maintains the connection table and the component handles shared across
//! all connections.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::Config;

use super::advisor::RuleBasedAdvisor;
use super::connection::Connection;
use super::identity::{IdentityProvider, StaticDirectory};
use super::notify::{NotificationDispatcher, PushSender, WebhookPushSender};
use super::registry::ParticipantRegistry;
use super::rooms::RoomStore;
use super::router::MessageRouter;
use super::typing::TypingTracker;

/// Coordinator state shared across all connections
#[derive(Clone)]
pub struct ChatState {
    /// All active connections indexed by session_id
    pub connections: Arc<RwLock<HashMap<Uuid, Arc<Connection>>>>,

    pub registry: Arc<ParticipantRegistry>,
    pub rooms: Arc<RoomStore>,
    pub typing: Arc<TypingTracker>,
    pub router: Arc<MessageRouter>,
    pub advisor: Arc<RuleBasedAdvisor>,
    pub identity: Arc<dyn IdentityProvider>,

    /// How many history messages a joining connection receives
    pub history_limit: usize,
}

impl ChatState {
    pub fn new(config: &Config) -> Self {
        let push: Arc<dyn PushSender> =
            Arc::new(WebhookPushSender::new(config.push_webhook_url.clone()));
        Self::with_collaborators(config, push, Arc::new(StaticDirectory))
    }

    /// Build the component graph with injected collaborators
    pub fn with_collaborators(
        config: &Config,
        push: Arc<dyn PushSender>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let registry = Arc::new(ParticipantRegistry::new());
        let rooms = Arc::new(RoomStore::new());
        let typing = Arc::new(TypingTracker::new());

        let notifications = Arc::new(NotificationDispatcher::new(
            Arc::clone(&rooms),
            Arc::clone(&registry),
            push,
            config.push_preview_max_chars,
        ));
        let router = Arc::new(MessageRouter::new(
            Arc::clone(&rooms),
            Arc::clone(&registry),
            notifications,
        ));
        let advisor = Arc::new(RuleBasedAdvisor::new(Arc::clone(&rooms)));

        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
            registry,
            rooms,
            typing,
            router,
            advisor,
            identity,
            history_limit: config.history_limit,
        }
    }

    /// Add a connection
    pub async fn add_connection(&self, conn: Connection) -> Arc<Connection> {
        let conn = Arc::new(conn);
        let mut connections = self.connections.write().await;
        connections.insert(conn.session_id, Arc::clone(&conn));

        tracing::info!(
            session_id = %conn.session_id,
            total_connections = connections.len(),
            "WebSocket connection added"
        );

        conn
    }

    /// Remove a connection
    pub async fn remove_connection(&self, session_id: &Uuid) {
        let mut connections = self.connections.write().await;
        if connections.remove(session_id).is_some() {
            tracing::info!(
                session_id = %session_id,
                remaining_connections = connections.len(),
                "WebSocket connection removed"
            );
        }
    }

    /// Get total number of active connections
    pub async fn connection_count(&self) -> usize {
        let connections = self.connections.read().await;
        connections.len()
    }

    /// Get statistics about the coordinator
    pub async fn stats(&self) -> ChatStats {
        ChatStats {
            active_connections: self.connection_count().await,
            active_rooms: self.rooms.room_count().await,
        }
    }

    /// Send an event to every active connection
    pub async fn broadcast_all(&self, event: super::events::ServerEvent) {
        let connections = self.connections.read().await;
        for conn in connections.values() {
            let _ = conn.send(event.clone());
        }
    }
}

/// Statistics about the coordinator
#[derive(Debug, Clone, serde::Serialize)]
pub struct ChatStats {
    /// Number of active connections
    pub active_connections: usize,
    /// Number of rooms
    pub active_rooms: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn config() -> Config {
        Config {
            bind_address: "127.0.0.1:0".to_string(),
            push_webhook_url: None,
            history_limit: 50,
            push_preview_max_chars: 100,
        }
    }

    #[tokio::test]
    async fn test_add_and_remove_connection() {
        let state = ChatState::new(&config());
        let (tx, _rx) = mpsc::unbounded_channel();

        let conn = state.add_connection(Connection::new(tx)).await;
        assert_eq!(state.connection_count().await, 1);

        state.remove_connection(&conn.session_id).await;
        assert_eq!(state.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_stats() {
        let state = ChatState::new(&config());
        let (tx, _rx) = mpsc::unbounded_channel();

        state.add_connection(Connection::new(tx)).await;

        let stats = state.stats().await;
        assert_eq!(stats.active_connections, 1);
        assert_eq!(stats.active_rooms, 0);
    }
}
