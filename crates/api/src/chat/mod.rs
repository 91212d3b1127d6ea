//! Real-time chat coordination
//!
//! The chat room coordinator: multi-room presence, message routing, typing
//! indicators, read receipts, rule-based repair advice and offline push
//! fan-out, reached over one WebSocket route.
//!
//! # Architecture
//!
//! - **Connection**: an active WebSocket connection and its auth state
//! - **Registry**: presence and live connection handle per participant
//! - **Rooms**: room metadata and ordered message history
//! - **Typing**: ephemeral per-room typing sets
//! - **Router**: message validation, storage and broadcast
//! - **Advisor**: rule-based symptom extraction and escalation
//! - **Notify**: push notifications for offline room members
//! - **Handler**: the axum session gateway wiring it all together
//! - **Events**: type-safe event definitions for client/server communication

pub mod advisor;
pub mod connection;
pub mod events;
pub mod handler;
pub mod identity;
pub mod notify;
pub mod registry;
pub mod rooms;
pub mod router;
pub mod state;
pub mod typing;

pub use handler::ws_handler;
pub use state::ChatState;
