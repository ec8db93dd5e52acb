//! In-process implementation of the store traits.
//!
//! Keeps each chat's messages sorted by position and the cursor cache in a
//! map, both behind one mutex so an append and its invalidation are observed
//! together. Useful for tests and for embedding the engine without a
//! database file.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::chat_id::ChatId;
use crate::entities::{
    CacheWrite, CursorCacheEntry, CursorCacheStore, Message, MessageQuery, MessageStore, Seek,
    StoredMessage,
};
use crate::error::StoreError;
use crate::types::{Direction, InvalidationScope, Position};

type CursorKey = (ChatId, Direction, u64);

#[derive(Debug, Default)]
struct Inner {
    /// Last `seq` handed out, across all chats.
    seq: u64,
    /// Per chat, ascending by position.
    chats: HashMap<ChatId, Vec<StoredMessage>>,
    cursors: HashMap<CursorKey, Position>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached cursors for `chat_id` across both directions.
    pub fn cursor_count(&self, chat_id: &ChatId) -> usize {
        self.lock()
            .cursors
            .keys()
            .filter(|(chat, _, _)| chat == chat_id)
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Every critical section leaves the maps consistent before it can
        // panic, so a poisoned lock still guards valid data.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Inner {
    fn delete_cursors(&mut self, chat_id: &ChatId, direction: Option<Direction>) -> u64 {
        let before = self.cursors.len();
        self.cursors.retain(|(chat, dir, _), _| {
            chat != chat_id || direction.is_some_and(|d| d != *dir)
        });
        (before - self.cursors.len()) as u64
    }

    fn invalidate(&mut self, chat_id: &ChatId, scope: InvalidationScope, sent_at: u64) -> u64 {
        let before = self.cursors.len();
        self.cursors.retain(|(chat, dir, _), pos| {
            chat != chat_id || !scope.drops(*dir, pos.sent_at, sent_at)
        });
        (before - self.cursors.len()) as u64
    }
}

impl MessageStore for MemoryStore {
    async fn append_message(
        &self,
        msg: &Message,
        scope: InvalidationScope,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.seq += 1;
        let seq = inner.seq;
        let log = inner.chats.entry(msg.chat_id.clone()).or_default();
        // `seq` is the largest yet, so the row goes after equal stamps.
        let at = log.partition_point(|m| m.message.sent_at <= msg.sent_at);
        log.insert(
            at,
            StoredMessage {
                seq,
                message: msg.clone(),
            },
        );
        let dropped = inner.invalidate(&msg.chat_id, scope, msg.sent_at);
        debug!(chat_id = %msg.chat_id, sent_at = msg.sent_at, dropped, %scope, "message appended");
        Ok(())
    }

    async fn query_messages(
        &self,
        query: &MessageQuery<'_>,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        let inner = self.lock();
        let Some(log) = inner.chats.get(query.chat_id) else {
            return Ok(Vec::new());
        };

        let ordered: Box<dyn Iterator<Item = &StoredMessage>> = match query.direction {
            Direction::Forward => Box::new(log.iter()),
            Direction::Reverse => Box::new(log.iter().rev()),
        };
        let limit = query.limit as usize;
        let rows = match query.seek {
            Seek::Offset(offset) => ordered
                .skip(usize::try_from(offset).unwrap_or(usize::MAX))
                .take(limit)
                .cloned()
                .collect(),
            Seek::From(bound) => ordered
                .skip_while(|m| !query.direction.reaches(m.position(), bound))
                .take(limit)
                .cloned()
                .collect(),
        };
        Ok(rows)
    }

    async fn latest_seq(&self, chat_id: &ChatId) -> Result<u64, StoreError> {
        let inner = self.lock();
        Ok(inner
            .chats
            .get(chat_id)
            .and_then(|log| log.iter().map(|m| m.seq).max())
            .unwrap_or(0))
    }
}

impl CursorCacheStore for MemoryStore {
    async fn find_cursor(
        &self,
        chat_id: &ChatId,
        direction: Direction,
        cursor: u64,
    ) -> Result<Option<CursorCacheEntry>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .cursors
            .get(&(chat_id.clone(), direction, cursor))
            .map(|&position| CursorCacheEntry {
                chat_id: chat_id.clone(),
                direction,
                cursor,
                position,
            }))
    }

    async fn insert_cursor(
        &self,
        entry: &CursorCacheEntry,
        seen: u64,
    ) -> Result<CacheWrite, StoreError> {
        let mut inner = self.lock();
        let key = (entry.chat_id.clone(), entry.direction, entry.cursor);
        if inner.cursors.contains_key(&key) {
            return Ok(CacheWrite::Duplicate);
        }
        let shifted = inner.chats.get(&entry.chat_id).is_some_and(|log| {
            log.iter()
                .any(|m| m.seq > seen && entry.direction.precedes(m.position(), entry.position))
        });
        if shifted {
            return Ok(CacheWrite::Superseded);
        }
        inner.cursors.insert(key, entry.position);
        Ok(CacheWrite::Inserted)
    }

    async fn delete_cursors(
        &self,
        chat_id: &ChatId,
        direction: Option<Direction>,
    ) -> Result<u64, StoreError> {
        Ok(self.lock().delete_cursors(chat_id, direction))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn message(chat: &ChatId, sent_at: u64, text: &str) -> Message {
        let (a, b) = chat.participants();
        Message {
            chat_id: chat.clone(),
            sender: a.to_owned(),
            receiver: b.to_owned(),
            text: text.to_owned(),
            sent_at,
        }
    }

    fn entry(chat: &ChatId, direction: Direction, cursor: u64, sent_at: u64, seq: u64) -> CursorCacheEntry {
        CursorCacheEntry {
            chat_id: chat.clone(),
            direction,
            cursor,
            position: Position::new(sent_at, seq),
        }
    }

    async fn texts(store: &MemoryStore, query: &MessageQuery<'_>) -> Vec<String> {
        store
            .query_messages(query)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.message.text)
            .collect()
    }

    #[tokio::test]
    async fn equal_stamps_keep_arrival_order_forward_and_flip_in_reverse() {
        let store = MemoryStore::new();
        let chat = ChatId::parse("a:b").unwrap();
        for (stamp, text) in [(5, "first"), (5, "second"), (1, "oldest")] {
            store
                .append_message(&message(&chat, stamp, text), InvalidationScope::Reverse)
                .await
                .unwrap();
        }

        let forward = MessageQuery {
            chat_id: &chat,
            direction: Direction::Forward,
            seek: Seek::Offset(0),
            limit: 10,
        };
        assert_eq!(texts(&store, &forward).await, ["oldest", "first", "second"]);

        let reverse = MessageQuery { direction: Direction::Reverse, ..forward.clone() };
        assert_eq!(texts(&store, &reverse).await, ["second", "first", "oldest"]);

        // "second" arrived as seq 2.
        let from_second = MessageQuery {
            seek: Seek::From(Position::new(5, 2)),
            ..forward
        };
        assert_eq!(texts(&store, &from_second).await, ["second"]);
        assert_eq!(store.latest_seq(&chat).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn unknown_chat_reads_empty() {
        let store = MemoryStore::new();
        let chat = ChatId::parse("x:y").unwrap();
        let query = MessageQuery {
            chat_id: &chat,
            direction: Direction::Reverse,
            seek: Seek::From(Position::new(10, 1)),
            limit: 5,
        };
        assert!(store.query_messages(&query).await.unwrap().is_empty());
        assert_eq!(store.latest_seq(&chat).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn append_invalidates_by_scope() {
        let store = MemoryStore::new();
        let chat = ChatId::parse("a:b").unwrap();
        store.insert_cursor(&entry(&chat, Direction::Forward, 1, 1, 1), 0).await.unwrap();
        store.insert_cursor(&entry(&chat, Direction::Reverse, 1, 1, 1), 0).await.unwrap();
        store.insert_cursor(&entry(&chat, Direction::Forward, 2, 9, 2), 0).await.unwrap();

        // In order for the forward entry at 1, backdated for the one at 9.
        store.append_message(&message(&chat, 5, "hi"), InvalidationScope::Reverse).await.unwrap();
        assert_eq!(store.cursor_count(&chat), 1);
        assert!(store.find_cursor(&chat, Direction::Forward, 1).await.unwrap().is_some());

        store.append_message(&message(&chat, 6, "yo"), InvalidationScope::All).await.unwrap();
        assert_eq!(store.cursor_count(&chat), 0);
    }

    #[tokio::test]
    async fn duplicate_cursor_keeps_first_value() {
        let store = MemoryStore::new();
        let chat = ChatId::parse("a:b").unwrap();
        let first = entry(&chat, Direction::Reverse, 4, 10, 1);
        let second = entry(&chat, Direction::Reverse, 4, 20, 2);

        assert_eq!(store.insert_cursor(&first, 0).await.unwrap(), CacheWrite::Inserted);
        assert_eq!(store.insert_cursor(&second, 0).await.unwrap(), CacheWrite::Duplicate);
        assert_eq!(
            store.find_cursor(&chat, Direction::Reverse, 4).await.unwrap(),
            Some(first)
        );
    }

    #[tokio::test]
    async fn write_after_a_shifting_append_is_superseded() {
        let store = MemoryStore::new();
        let chat = ChatId::parse("a:b").unwrap();
        for (stamp, text) in [(10, "a"), (20, "b")] {
            store
                .append_message(&message(&chat, stamp, text), InvalidationScope::Reverse)
                .await
                .unwrap();
        }
        let seen = store.latest_seq(&chat).await.unwrap();
        // Reverse offset 1 holds "a" as of `seen`.
        let stale = entry(&chat, Direction::Reverse, 1, 10, 1);

        store
            .append_message(&message(&chat, 30, "c"), InvalidationScope::Reverse)
            .await
            .unwrap();

        assert_eq!(store.insert_cursor(&stale, seen).await.unwrap(), CacheWrite::Superseded);
        assert_eq!(store.cursor_count(&chat), 0);
        let forward = entry(&chat, Direction::Forward, 1, 20, 2);
        assert_eq!(store.insert_cursor(&forward, seen).await.unwrap(), CacheWrite::Inserted);
    }
}
