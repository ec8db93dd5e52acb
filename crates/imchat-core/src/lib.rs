//! Message storage and cursor-cache pagination for two-party chats.

pub mod chat_id;
pub mod entities;
pub mod error;
pub mod memory;
pub mod pagination;
pub mod service;
pub mod types;
pub mod validation;

pub use chat_id::ChatId;
pub use entities::{ChatStore, CursorCacheEntry, Message, PoolConfig, SqlStore, StoredMessage};
pub use error::{ServiceError, StoreError, ValidationError};
pub use memory::MemoryStore;
pub use pagination::{Page, Paginator, Resolution};
pub use service::{ChatService, PullCommand, SendCommand};
pub use types::{Direction, InvalidationScope, Position, DEFAULT_PAGE_SIZE};
