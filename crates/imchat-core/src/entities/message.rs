use std::future::Future;

use tracing::debug;

use crate::chat_id::ChatId;
use crate::entities::cursor_cache::invalidate_rows;
use crate::entities::{from_sql, to_sql, dao::Message, dao::StoredMessage, SqlStore};
use crate::error::StoreError;
use crate::types::{Direction, InvalidationScope, Position};

/// Where a page starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seek {
    /// Skip this many rows of the ordered chat. Costs O(offset).
    Offset(u64),
    /// Start at the row at this position, or the first one after it in the
    /// query's direction.
    From(Position),
}

/// A single page read over one chat.
#[derive(Debug, Clone)]
pub struct MessageQuery<'a> {
    pub chat_id: &'a ChatId,
    pub direction: Direction,
    pub seek: Seek,
    /// Maximum rows returned.
    pub limit: u32,
}

pub trait MessageStore: Send + Sync + 'static {
    /// Persist `msg` and drop the cursor-cache entries of its chat that the
    /// new row shifts (see [`InvalidationScope`]), as one unit. If the insert
    /// fails nothing is deleted.
    fn append_message(
        &self,
        msg: &Message,
        scope: InvalidationScope,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Messages of one chat in the query's direction, ordered by `sent_at`
    /// then arrival.
    fn query_messages(
        &self,
        query: &MessageQuery<'_>,
    ) -> impl Future<Output = Result<Vec<StoredMessage>, StoreError>> + Send;

    /// Largest `seq` stored for `chat_id`, `0` for an empty chat.
    fn latest_seq(&self, chat_id: &ChatId) -> impl Future<Output = Result<u64, StoreError>> + Send;
}

type MessageRow = (i64, String, String, String, i64);

impl MessageStore for SqlStore {
    async fn append_message(
        &self,
        msg: &Message,
        scope: InvalidationScope,
    ) -> Result<(), StoreError> {
        let sent_at = to_sql("sent_at", msg.sent_at)?;

        let mut tx = self.pool().begin().await?;
        sqlx::query(
            "INSERT INTO chat_messages (chat_id, sender, receiver, text, sent_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(msg.chat_id.as_str())
        .bind(&msg.sender)
        .bind(&msg.receiver)
        .bind(&msg.text)
        .bind(sent_at)
        .execute(&mut *tx)
        .await?;
        let dropped = invalidate_rows(&mut *tx, &msg.chat_id, scope, sent_at).await?;
        tx.commit().await?;

        debug!(chat_id = %msg.chat_id, sent_at = msg.sent_at, dropped, %scope, "message appended");
        Ok(())
    }

    async fn query_messages(
        &self,
        query: &MessageQuery<'_>,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        let order = query.direction.sql_order();
        let limit = i64::from(query.limit);

        let rows: Vec<MessageRow> = match query.seek {
            Seek::Offset(offset) => {
                let sql = format!(
                    "SELECT id, sender, receiver, text, sent_at FROM chat_messages \
                     WHERE chat_id = ?1 ORDER BY sent_at {order}, id {order} \
                     LIMIT ?2 OFFSET ?3"
                );
                sqlx::query_as(&sql)
                    .bind(query.chat_id.as_str())
                    .bind(limit)
                    .bind(to_sql("offset", offset)?)
                    .fetch_all(self.pool())
                    .await?
            }
            Seek::From(bound) => {
                let sql = format!(
                    "SELECT id, sender, receiver, text, sent_at FROM chat_messages \
                     WHERE chat_id = ?1 AND (sent_at, id) {cmp} (?2, ?3) \
                     ORDER BY sent_at {order}, id {order} LIMIT ?4",
                    cmp = query.direction.sql_bound(),
                );
                sqlx::query_as(&sql)
                    .bind(query.chat_id.as_str())
                    .bind(to_sql("sent_at", bound.sent_at)?)
                    .bind(to_sql("seq", bound.seq)?)
                    .bind(limit)
                    .fetch_all(self.pool())
                    .await?
            }
        };

        rows.into_iter()
            .map(|(id, sender, receiver, text, sent_at)| {
                Ok(StoredMessage {
                    seq: from_sql("seq", id)?,
                    message: Message {
                        chat_id: query.chat_id.clone(),
                        sender,
                        receiver,
                        text,
                        sent_at: from_sql("sent_at", sent_at)?,
                    },
                })
            })
            .collect()
    }

    async fn latest_seq(&self, chat_id: &ChatId) -> Result<u64, StoreError> {
        let (seq,): (i64,) =
            sqlx::query_as("SELECT COALESCE(MAX(id), 0) FROM chat_messages WHERE chat_id = ?1")
                .bind(chat_id.as_str())
                .fetch_one(self.pool())
                .await?;
        from_sql("seq", seq)
    }
}
