use crate::chat_id::ChatId;
use crate::types::{Direction, Position};

use super::CursorCacheEntry;

/// A single row in the `chat_messages` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub chat_id: ChatId,
    pub sender: String,
    pub receiver: String,
    /// Trimmed, never empty.
    pub text: String,
    /// Microseconds since the Unix epoch.
    pub sent_at: u64,
}

/// A [`Message`] read back from a store, with the arrival sequence number
/// the store assigned to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub seq: u64,
    pub message: Message,
}

impl StoredMessage {
    pub fn position(&self) -> Position {
        Position::new(self.message.sent_at, self.seq)
    }

    /// Cache entry recording that this message sits at `cursor` when the
    /// chat is read in `direction`.
    pub fn cursor_at(&self, direction: Direction, cursor: u64) -> CursorCacheEntry {
        CursorCacheEntry {
            chat_id: self.message.chat_id.clone(),
            direction,
            cursor,
            position: self.position(),
        }
    }
}
