pub mod cursor;
pub mod message;

pub use cursor::CursorCacheEntry;
pub use message::{Message, StoredMessage};
