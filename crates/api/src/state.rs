//! Shared application state

use std::sync::Arc;

use crate::chat::ChatState;
use crate::config::Config;

/// State shared across all routes and connections
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub chat: ChatState,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let chat = ChatState::new(&config);
        Self {
            config: Arc::new(config),
            chat,
        }
    }
}
