//! WebSocket event types and serialization
//!
//! Defines all client-to-server and server-to-client event types
//! with type-safe serde serialization.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use fixchat_shared::{Attachment, Message, MessageDraft, Participant, Room, RoomKind};

// =============================================================================
// Client-to-Server Events
// =============================================================================

/// Events sent from client to server
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Identify this connection; must precede every other event
    Authenticate {
        user_id: Uuid,
        user_role: String,
        #[serde(default)]
        repair_ticket_id: Option<Uuid>,
    },

    /// Join (or lazily create) the room for a repair ticket
    JoinRepairChat { repair_ticket_id: Uuid },

    /// Send a message to a room
    SendMessage {
        room_id: String,
        message: MessageDraft,
    },

    /// Start or stop typing in a room
    Typing { room_id: String, is_typing: bool },

    /// Mark a message as read
    MarkRead { room_id: String, message_id: Uuid },

    /// Ask the repair advisor for help in a room
    RequestAiAssistance {
        room_id: String,
        #[serde(default)]
        repair_ticket_id: Option<Uuid>,
        #[serde(default)]
        context: Option<String>,
        request_type: String,
    },

    /// Invite the room to a video call
    StartVideoCall { room_id: String, call_type: String },

    /// Share a file with a room
    ShareFile { room_id: String, file: Attachment },

    /// Create an ad-hoc room
    CreateRoom {
        name: String,
        kind: RoomKind,
        #[serde(default)]
        participants: Vec<Uuid>,
    },

    /// Leave a room
    LeaveRoom { room_id: String },

    /// Heartbeat ping to keep connection alive
    Ping,
}

// =============================================================================
// Server-to-Client Events
// =============================================================================

/// Events sent from server to client
#[derive(Debug, Serialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Connection acknowledged
    Connected { session_id: Uuid },

    /// Authentication accepted
    Authenticated { user: Participant, rooms: Vec<Room> },

    /// Joined a room; history and metadata for the joining connection only
    RoomJoined { room: Room, messages: Vec<Message> },

    /// Another participant joined a room
    UserJoined { room: Room, user: Participant },

    /// A participant left a room
    UserLeft { room: Room, user: Participant },

    /// New message in a subscribed room
    Message { message: Message },

    /// Typing indicator changed
    Typing {
        room_id: String,
        user_id: Uuid,
        user_name: String,
        is_typing: bool,
    },

    /// A participant read a message
    MessageRead {
        room_id: String,
        message_id: Uuid,
        user_id: Uuid,
        #[serde(with = "time::serde::rfc3339")]
        read_at: OffsetDateTime,
    },

    /// Invitation to a video call
    VideoCallInvitation {
        call_id: Uuid,
        caller: Participant,
        call_type: String,
        room_id: String,
    },

    /// Presence snapshot of currently-online participants
    UserStatusUpdate { users: Vec<Participant> },

    /// An ad-hoc room was created
    RoomCreated { room: Room },

    /// Heartbeat response
    Pong,

    /// Error scoped to the requesting connection
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_event_deserialization() {
        let json = r#"{"type":"join_repair_chat","repair_ticket_id":"550e8400-e29b-41d4-a716-446655440000"}"#;
        let event: ClientEvent = serde_json::from_str(json).unwrap();
        match event {
            ClientEvent::JoinRepairChat { repair_ticket_id } => {
                assert_eq!(
                    repair_ticket_id.to_string(),
                    "550e8400-e29b-41d4-a716-446655440000"
                );
            }
            _ => panic!("Expected JoinRepairChat event"),
        }
    }

    #[test]
    fn test_authenticate_without_ticket() {
        let json = r#"{"type":"authenticate","user_id":"550e8400-e29b-41d4-a716-446655440000","user_role":"customer"}"#;
        let event: ClientEvent = serde_json::from_str(json).unwrap();
        match event {
            ClientEvent::Authenticate {
                repair_ticket_id, ..
            } => assert!(repair_ticket_id.is_none()),
            _ => panic!("Expected Authenticate event"),
        }
    }

    #[test]
    fn test_server_event_serialization() {
        let event = ServerEvent::Pong;
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"type":"pong"}"#);
    }

    #[test]
    fn test_error_event_serialization() {
        let event = ServerEvent::Error {
            message: "Room not found: repair-9".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("error"));
        assert!(json.contains("repair-9"));
    }
}
