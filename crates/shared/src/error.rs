//! Error types for fixchat

use thiserror::Error;

/// Domain errors produced by the chat coordinator
///
/// All variants are caught at the session gateway and reported only to the
/// requesting connection, never broadcast and never fatal to the connection.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Room not found: {0}")]
    RoomNotFound(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Push notification failed: {0}")]
    PushNotificationFailed(String),
}

pub type ChatResult<T> = Result<T, ChatError>;
