use std::future::Future;

use sqlx::{Executor, Sqlite};

use crate::chat_id::ChatId;
use crate::entities::{from_sql, to_sql, dao::CursorCacheEntry, SqlStore};
use crate::error::StoreError;
use crate::types::{Direction, InvalidationScope, Position};

/// Outcome of a cursor-cache write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheWrite {
    Inserted,
    /// The key already existed. The stored position is left as it was; it is
    /// the same value by construction.
    Duplicate,
    /// A message appended after the caller's read lands before the entry's
    /// row, so the offset no longer names that row. Nothing was written.
    Superseded,
}

/// Derived index from `(chat, direction, cursor)` to the position of the row
/// at that offset.
///
/// Purely an optimisation: losing entries only costs offset scans.
pub trait CursorCacheStore: Send + Sync + 'static {
    fn find_cursor(
        &self,
        chat_id: &ChatId,
        direction: Direction,
        cursor: u64,
    ) -> impl Future<Output = Result<Option<CursorCacheEntry>, StoreError>> + Send;

    /// Insert unless the key exists. Racing writers of one key all succeed.
    ///
    /// `seen` is the chat's newest `seq` when the caller started the read
    /// that produced `entry`. Appends after that point are checked here, in
    /// the same statement as the insert, because their invalidation may
    /// already have run.
    fn insert_cursor(
        &self,
        entry: &CursorCacheEntry,
        seen: u64,
    ) -> impl Future<Output = Result<CacheWrite, StoreError>> + Send;

    /// Remove every entry of `chat_id`, or only those of one direction.
    /// Returns the number of entries removed.
    fn delete_cursors(
        &self,
        chat_id: &ChatId,
        direction: Option<Direction>,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;
}

impl CursorCacheStore for SqlStore {
    async fn find_cursor(
        &self,
        chat_id: &ChatId,
        direction: Direction,
        cursor: u64,
    ) -> Result<Option<CursorCacheEntry>, StoreError> {
        let row: Option<(i64, i64)> = sqlx::query_as(
            "SELECT sent_at, message_id FROM chat_cursor_caches \
             WHERE chat_id = ?1 AND reverse = ?2 AND cursor = ?3",
        )
        .bind(chat_id.as_str())
        .bind(direction.is_reverse())
        .bind(to_sql("cursor", cursor)?)
        .fetch_optional(self.pool())
        .await?;

        row.map(|(sent_at, seq)| {
            Ok(CursorCacheEntry {
                chat_id: chat_id.clone(),
                direction,
                cursor,
                position: Position::new(from_sql("sent_at", sent_at)?, from_sql("seq", seq)?),
            })
        })
        .transpose()
    }

    async fn insert_cursor(
        &self,
        entry: &CursorCacheEntry,
        seen: u64,
    ) -> Result<CacheWrite, StoreError> {
        // The WHERE clause also keeps SQLite from reading ON CONFLICT as a
        // join constraint.
        let sql = format!(
            "INSERT INTO chat_cursor_caches (chat_id, reverse, cursor, sent_at, message_id) \
             SELECT ?1, ?2, ?3, ?4, ?5 \
             WHERE NOT EXISTS ( \
                 SELECT 1 FROM chat_messages \
                 WHERE chat_id = ?1 AND id > ?6 AND (sent_at, id) {before} (?4, ?5) \
             ) \
             ON CONFLICT (chat_id, reverse, cursor) DO NOTHING",
            before = entry.direction.sql_before(),
        );
        let result = sqlx::query(&sql)
            .bind(entry.chat_id.as_str())
            .bind(entry.direction.is_reverse())
            .bind(to_sql("cursor", entry.cursor)?)
            .bind(to_sql("sent_at", entry.position.sent_at)?)
            .bind(to_sql("seq", entry.position.seq)?)
            .bind(to_sql("seq", seen)?)
            .execute(self.pool())
            .await?;

        if result.rows_affected() > 0 {
            return Ok(CacheWrite::Inserted);
        }
        let existing = self
            .find_cursor(&entry.chat_id, entry.direction, entry.cursor)
            .await?;
        Ok(if existing.is_some() {
            CacheWrite::Duplicate
        } else {
            CacheWrite::Superseded
        })
    }

    async fn delete_cursors(
        &self,
        chat_id: &ChatId,
        direction: Option<Direction>,
    ) -> Result<u64, StoreError> {
        Ok(delete_cursor_rows(self.pool(), chat_id, direction).await?)
    }
}

async fn delete_cursor_rows<'e, E>(
    executor: E,
    chat_id: &ChatId,
    direction: Option<Direction>,
) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = match direction {
        Some(direction) => {
            sqlx::query("DELETE FROM chat_cursor_caches WHERE chat_id = ?1 AND reverse = ?2")
                .bind(chat_id.as_str())
                .bind(direction.is_reverse())
                .execute(executor)
                .await?
        }
        None => {
            sqlx::query("DELETE FROM chat_cursor_caches WHERE chat_id = ?1")
                .bind(chat_id.as_str())
                .execute(executor)
                .await?
        }
    };
    Ok(result.rows_affected())
}

/// Drops the entries an append stamped `sent_at` shifts; runs inside the
/// append transaction. Mirrors [`InvalidationScope::drops`].
pub(crate) async fn invalidate_rows<'e, E>(
    executor: E,
    chat_id: &ChatId,
    scope: InvalidationScope,
    sent_at: i64,
) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    match scope {
        InvalidationScope::All => delete_cursor_rows(executor, chat_id, None).await,
        InvalidationScope::Reverse => {
            let result = sqlx::query(
                "DELETE FROM chat_cursor_caches \
                 WHERE chat_id = ?1 AND (reverse <> 0 OR sent_at > ?2)",
            )
            .bind(chat_id.as_str())
            .bind(sent_at)
            .execute(executor)
            .await?;
            Ok(result.rows_affected())
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::entities::{Message, MessageStore};

    fn entry(chat: &ChatId, direction: Direction, cursor: u64, sent_at: u64) -> CursorCacheEntry {
        CursorCacheEntry {
            chat_id: chat.clone(),
            direction,
            cursor,
            position: Position::new(sent_at, cursor),
        }
    }

    async fn append(store: &SqlStore, chat: &ChatId, sent_at: u64) {
        let msg = Message {
            chat_id: chat.clone(),
            sender: "a".into(),
            receiver: "b".into(),
            text: sent_at.to_string(),
            sent_at,
        };
        store.append_message(&msg, InvalidationScope::Reverse).await.unwrap();
    }

    #[tokio::test]
    async fn insert_then_find() {
        let store = SqlStore::in_memory().await.unwrap();
        let chat = ChatId::parse("b:a").unwrap();

        assert_eq!(store.find_cursor(&chat, Direction::Forward, 5).await.unwrap(), None);
        let e = entry(&chat, Direction::Forward, 5, 1_700_000_000_000_000);
        assert_eq!(store.insert_cursor(&e, 0).await.unwrap(), CacheWrite::Inserted);
        assert_eq!(
            store.find_cursor(&chat, Direction::Forward, 5).await.unwrap(),
            Some(e)
        );
        // Same offset, other direction, is a different key.
        assert_eq!(store.find_cursor(&chat, Direction::Reverse, 5).await.unwrap(), None);
    }

    #[tokio::test]
    async fn duplicate_insert_is_reported_not_raised() {
        let store = SqlStore::in_memory().await.unwrap();
        let chat = ChatId::parse("a:b").unwrap();
        let e = entry(&chat, Direction::Reverse, 3, 77);

        assert_eq!(store.insert_cursor(&e, 0).await.unwrap(), CacheWrite::Inserted);
        assert_eq!(store.insert_cursor(&e, 0).await.unwrap(), CacheWrite::Duplicate);
        assert_eq!(
            store
                .find_cursor(&chat, Direction::Reverse, 3)
                .await
                .unwrap()
                .map(|e| e.position.sent_at),
            Some(77)
        );
    }

    #[tokio::test]
    async fn write_is_skipped_when_a_later_append_shifts_the_row() {
        let store = SqlStore::in_memory().await.unwrap();
        let chat = ChatId::parse("a:b").unwrap();
        for sent_at in [10, 20, 30] {
            append(&store, &chat, sent_at).await;
        }
        // Read at seq 3: reverse offset 1 holds 20, forward offset 1 holds 20.
        let reverse = CursorCacheEntry {
            position: Position::new(20, 2),
            ..entry(&chat, Direction::Reverse, 1, 0)
        };
        let forward = CursorCacheEntry {
            position: Position::new(20, 2),
            ..entry(&chat, Direction::Forward, 1, 0)
        };

        append(&store, &chat, 40).await;

        // 40 sorts before 20 in reverse only.
        assert_eq!(store.insert_cursor(&reverse, 3).await.unwrap(), CacheWrite::Superseded);
        assert_eq!(store.insert_cursor(&forward, 3).await.unwrap(), CacheWrite::Inserted);
        assert!(store.find_cursor(&chat, Direction::Reverse, 1).await.unwrap().is_none());

        // Observed through seq 4, the reverse entry at offset 2 is current.
        let reverse = CursorCacheEntry {
            cursor: 2,
            ..reverse
        };
        assert_eq!(store.insert_cursor(&reverse, 4).await.unwrap(), CacheWrite::Inserted);
    }

    #[tokio::test]
    async fn delete_by_direction_or_whole_chat() {
        let store = SqlStore::in_memory().await.unwrap();
        let chat = ChatId::parse("a:b").unwrap();
        for cursor in 1..=3 {
            store.insert_cursor(&entry(&chat, Direction::Forward, cursor, cursor), 0).await.unwrap();
            store.insert_cursor(&entry(&chat, Direction::Reverse, cursor, cursor), 0).await.unwrap();
        }

        assert_eq!(store.delete_cursors(&chat, Some(Direction::Reverse)).await.unwrap(), 3);
        assert!(store.find_cursor(&chat, Direction::Forward, 1).await.unwrap().is_some());
        assert_eq!(store.delete_cursors(&chat, None).await.unwrap(), 3);
        assert!(store.find_cursor(&chat, Direction::Forward, 1).await.unwrap().is_none());
    }
}
