//! Common types used across fixchat
//!
//! The domain model for the chat coordinator: participants, rooms, messages
//! and the advisor's response shapes. Everything here is plain data; the
//! stores in `fixchat-api` own lifecycle and mutation rules.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

// =============================================================================
// Enums
// =============================================================================

/// Role a participant plays in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Customer,
    Technician,
    Admin,
    Ai,
}

/// Presence status of a participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Online,
    Offline,
    Away,
}

/// Kind of room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomKind {
    Direct,
    Group,
    Support,
}

/// Kind of message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    File,
    System,
    VideoCall,
    AiSuggestion,
}

/// Delivery status of a message
///
/// Only `Sent` is modeled; there are no further transitions. Read state is
/// tracked per participant in [`MessageMetadata::read_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
}

/// Urgency assessed by the advisor
///
/// `Low` is declared but the rule-based assessor only ever produces
/// `Medium` or `High`, matching the behavior this service was ported from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

// =============================================================================
// Participant
// =============================================================================

/// An identity attached to a connection
///
/// Created on first authenticated connection, mutated on connect/disconnect,
/// never deleted. A departed participant is only marked offline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: Uuid,
    pub name: String,
    pub role: ParticipantRole,
    pub status: PresenceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expertise: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub last_seen: OffsetDateTime,
}

impl Participant {
    pub fn new(id: Uuid, name: impl Into<String>, role: ParticipantRole) -> Self {
        Self {
            id,
            name: name.into(),
            role,
            status: PresenceStatus::Online,
            avatar: None,
            expertise: Vec::new(),
            last_seen: OffsetDateTime::now_utc(),
        }
    }
}

// =============================================================================
// Room
// =============================================================================

/// Optional room metadata (priority, tags)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// A named channel grouping participants and an ordered message history
///
/// Room ids are strings: ticket rooms use `repair-<ticket uuid>`, ad-hoc
/// rooms a fresh uuid string. The participant list has set semantics keyed
/// by participant id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub name: String,
    pub kind: RoomKind,
    pub participants: Vec<Participant>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<Uuid>,
    #[serde(default)]
    pub metadata: RoomMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message: Option<Box<Message>>,
    pub unread_count: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Initial state for a lazily-created room
///
/// Passed to `RoomStore::get_or_create` by the caller that knows what the
/// room should look like, keeping creation policy out of the store.
#[derive(Debug, Clone)]
pub struct RoomSeed {
    pub name: String,
    pub kind: RoomKind,
    pub ticket_id: Option<Uuid>,
    pub metadata: RoomMetadata,
}

// =============================================================================
// Message
// =============================================================================

/// Read receipt: a participant has seen a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadReceipt {
    pub participant_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub read_at: OffsetDateTime,
}

/// File attached to a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

/// Descriptor for a video call session carried in message metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSession {
    pub call_id: Uuid,
    pub call_type: String,
    pub started_by: Uuid,
}

/// Metadata bag attached to a message
///
/// `read_by` is the only field ever mutated after a message is appended to a
/// room: append-only, deduplicated by participant id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageMetadata {
    #[serde(default)]
    pub read_by: Vec<ReadReceipt>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call: Option<CallSession>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai: Option<AiSuggestion>,
}

/// A message in a room's history
///
/// The sender is a snapshot of the participant at send time, not a live
/// reference; presence changes after the fact do not rewrite history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub room_id: String,
    pub sender: Participant,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub kind: MessageKind,
    pub status: DeliveryStatus,
    #[serde(default)]
    pub metadata: MessageMetadata,
}

/// Client-supplied portion of an outgoing message
///
/// The sender, timestamp, status and read receipts are stamped
/// authoritatively by the router; nothing client-supplied is trusted there.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageDraft {
    pub content: String,
    #[serde(default = "MessageDraft::default_kind")]
    pub kind: MessageKind,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl MessageDraft {
    fn default_kind() -> MessageKind {
        MessageKind::Text
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            kind: MessageKind::Text,
            attachments: Vec::new(),
        }
    }
}

// =============================================================================
// Advisor
// =============================================================================

/// Rough cost estimate produced by the advisor's rule table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub min: u32,
    pub max: u32,
    pub currency: String,
}

/// Structured payload behind an `ai_suggestion` message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiSuggestion {
    pub symptoms: Vec<String>,
    pub urgency: Urgency,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_estimate: Option<CostEstimate>,
}

/// The advisor's answer to an assistance request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdvisorResponse {
    /// Rendered response text, stored and broadcast as a regular message
    pub content: String,
    /// Follow-up quick replies offered to the requester
    pub suggestions: Vec<String>,
    pub symptoms: Vec<String>,
    pub urgency: Urgency,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_estimate: Option<CostEstimate>,
    pub escalate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalation_reason: Option<String>,
}
