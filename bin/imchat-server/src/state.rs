//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use imchat_core::{ChatService, SqlStore};

use crate::config::Config;

/// State shared across all HTTP handlers.
#[derive(Debug)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// `Send` / `Pull` over the SQLite message store.
    pub chat: ChatService<SqlStore>,
}

impl AppState {
    /// Wire the chat service to `store` with the configured cache policy.
    pub fn new(config: Config, store: Arc<SqlStore>) -> Self {
        let chat = ChatService::new(store)
            .with_invalidation(config.cache_invalidation)
            .with_default_page_size(config.default_page_size);
        Self {
            config: Arc::new(config),
            chat,
        }
    }
}
