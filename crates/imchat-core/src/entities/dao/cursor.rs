use crate::chat_id::ChatId;
use crate::types::{Direction, Position};

/// A row in the `chat_cursor_caches` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorCacheEntry {
    pub chat_id: ChatId,
    pub direction: Direction,
    /// Offset into the chat read in `direction`.
    pub cursor: u64,
    /// Position of the message at that offset.
    pub position: Position,
}
