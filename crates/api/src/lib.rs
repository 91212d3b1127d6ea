//! fixchat API Library
//!
//! This crate contains the chat coordinator server for fixchat.

pub mod chat;
pub mod config;
pub mod routes;
pub mod state;

pub use chat::ChatState;
pub use config::Config;
pub use state::AppState;
