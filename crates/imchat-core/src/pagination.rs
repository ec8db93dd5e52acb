//! Cursor-cache pagination.
//!
//! A cursor is an offset into a chat read in one direction. Resolving an
//! offset with `OFFSET n` costs O(n), so every offset the engine learns is
//! written to the cursor cache as `(chat, direction, offset) -> (sent_at, seq)`.
//! A later pull for that offset turns into a range scan starting at the
//! cached position, which costs O(page size) however deep the cursor is.
//!
//! Each page also caches the position of the first row *past* the page under
//! `next_cursor`, so following `next_cursor` always hits the cache unless an
//! append invalidated it in between.
//!
//! The cache never decides what a page contains, only how it is fetched:
//! lookup failures fall back to the offset scan and write failures are logged
//! and ignored. Entries name rows by `(sent_at, seq)`, so repeated stamps
//! never blur two rows into one. Every write carries the chat's newest `seq`
//! from before the read, and the store refuses it if a message appended since
//! then has shifted the row.

use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::chat_id::ChatId;
use crate::entities::{
    CacheWrite, ChatStore, CursorCacheEntry, Message, MessageQuery, Seek,
};
use crate::error::StoreError;
use crate::types::{Direction, Position, DEFAULT_PAGE_SIZE};

/// How a page's starting row was located.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Range scan from a cached position.
    CacheHit,
    /// `OFFSET cursor` scan.
    OffsetScan,
}

/// One page of a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// At most `limit` messages, in the requested direction.
    pub messages: Vec<Message>,
    pub has_more: bool,
    /// Present exactly when `has_more` is set.
    pub next_cursor: Option<u64>,
    pub resolution: Resolution,
}

#[derive(Debug)]
pub struct Paginator<S> {
    store: Arc<S>,
    default_limit: u32,
}

impl<S> Clone for Paginator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            default_limit: self.default_limit,
        }
    }
}

impl<S: ChatStore> Paginator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            default_limit: DEFAULT_PAGE_SIZE,
        }
    }

    /// Page size used for `limit = 0`. Zero restores [`DEFAULT_PAGE_SIZE`].
    pub fn with_default_limit(mut self, limit: u32) -> Self {
        self.default_limit = if limit == 0 { DEFAULT_PAGE_SIZE } else { limit };
        self
    }

    /// Read up to `limit` messages of `chat_id` starting at offset `cursor`.
    ///
    /// `limit = 0` means the default page size. A cursor at or past the end
    /// of the chat yields an empty page without a next cursor.
    pub async fn pull(
        &self,
        chat_id: &ChatId,
        cursor: u64,
        limit: u32,
        direction: Direction,
    ) -> Result<Page, StoreError> {
        let limit = if limit == 0 { self.default_limit } else { limit };
        // One extra row tells whether another page exists.
        let fetch = limit.saturating_add(1);
        // Taken before anything else is read.
        let seen = self.store.latest_seq(chat_id).await?;

        let (mut rows, resolution) = match self.cached_position(chat_id, direction, cursor).await {
            Some(position) => {
                let query = MessageQuery {
                    chat_id,
                    direction,
                    seek: Seek::From(position),
                    limit: fetch,
                };
                (self.store.query_messages(&query).await?, Resolution::CacheHit)
            }
            None => {
                let query = MessageQuery {
                    chat_id,
                    direction,
                    seek: Seek::Offset(cursor),
                    limit: fetch,
                };
                let rows = self.store.query_messages(&query).await?;
                if cursor > 0 {
                    if let Some(first) = rows.first() {
                        self.remember(first.cursor_at(direction, cursor), seen).await;
                    }
                }
                (rows, Resolution::OffsetScan)
            }
        };

        let page_len = limit as usize;
        let next_cursor = if rows.len() > page_len {
            let next = cursor.saturating_add(u64::from(limit));
            self.remember(rows[page_len].cursor_at(direction, next), seen).await;
            rows.truncate(page_len);
            Some(next)
        } else {
            None
        };

        debug!(
            chat_id = %chat_id,
            %direction,
            cursor,
            limit,
            returned = rows.len(),
            ?next_cursor,
            ?resolution,
            "pull served"
        );

        Ok(Page {
            messages: rows.into_iter().map(|row| row.message).collect(),
            has_more: next_cursor.is_some(),
            next_cursor,
            resolution,
        })
    }

    async fn cached_position(
        &self,
        chat_id: &ChatId,
        direction: Direction,
        cursor: u64,
    ) -> Option<Position> {
        if cursor == 0 {
            return None;
        }
        match self.store.find_cursor(chat_id, direction, cursor).await {
            Ok(entry) => entry.map(|e| e.position),
            Err(e) => {
                warn!(error = %e, chat_id = %chat_id, %direction, cursor, "cursor cache lookup failed; scanning by offset");
                None
            }
        }
    }

    async fn remember(&self, entry: CursorCacheEntry, seen: u64) {
        match self.store.insert_cursor(&entry, seen).await {
            Ok(CacheWrite::Inserted) => {
                trace!(chat_id = %entry.chat_id, direction = %entry.direction, cursor = entry.cursor, "cursor cached");
            }
            // A concurrent pull computed the same entry first.
            Ok(CacheWrite::Duplicate) => {}
            Ok(CacheWrite::Superseded) => {
                debug!(
                    chat_id = %entry.chat_id,
                    direction = %entry.direction,
                    cursor = entry.cursor,
                    "cursor not cached; chat changed during the read"
                );
            }
            Err(e) => {
                warn!(
                    error = %e,
                    chat_id = %entry.chat_id,
                    direction = %entry.direction,
                    cursor = entry.cursor,
                    "failed to write cursor cache entry"
                );
            }
        }
    }
}
