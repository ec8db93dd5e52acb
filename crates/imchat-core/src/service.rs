//! Transport-independent `Send` / `Pull` operations.
//!
//! [`ChatService`] validates raw request fields, runs the append path or the
//! pagination engine, and reports failures as [`ServiceError`], which carries
//! the wire result code. Store failures are logged here with full detail;
//! callers only ever see [`crate::error::GENERIC_FAILURE`].

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};

use crate::entities::{ChatStore, Message};
use crate::error::{ServiceError, StoreError};
use crate::pagination::{Page, Paginator};
use crate::types::{Direction, InvalidationScope};
use crate::validation;

/// Raw `Send` request fields.
#[derive(Debug, Clone, Default)]
pub struct SendCommand {
    pub chat: String,
    pub sender: String,
    pub text: String,
    /// Microseconds since the Unix epoch; `None` stamps the message on arrival.
    pub send_time: Option<i64>,
}

/// Raw `Pull` request fields.
#[derive(Debug, Clone, Default)]
pub struct PullCommand {
    pub chat: String,
    pub cursor: i64,
    /// `0` means the default page size.
    pub limit: i32,
    pub reverse: bool,
}

#[derive(Debug)]
pub struct ChatService<S> {
    store: Arc<S>,
    paginator: Paginator<S>,
    invalidation: InvalidationScope,
}

impl<S: ChatStore> ChatService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            paginator: Paginator::new(Arc::clone(&store)),
            store,
            invalidation: InvalidationScope::default(),
        }
    }

    /// Which cursor-cache entries each append drops.
    pub fn with_invalidation(mut self, scope: InvalidationScope) -> Self {
        self.invalidation = scope;
        self
    }

    /// Page size for pulls that ask for `limit = 0`.
    pub fn with_default_page_size(mut self, size: u32) -> Self {
        self.paginator = self.paginator.with_default_limit(size);
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Validate and append one message. Returns the stored row.
    pub async fn send(&self, cmd: SendCommand) -> Result<Message, ServiceError> {
        let send_time = cmd.send_time.unwrap_or_else(now_micros);
        let msg = validation::message(&cmd.chat, &cmd.sender, &cmd.text, send_time)?;
        self.append(&msg).await.inspect_err(|e| {
            error!(error = %e, chat_id = %msg.chat_id, "failed to append message");
        })?;
        info!(chat_id = %msg.chat_id, sender = %msg.sender, sent_at = msg.sent_at, "message stored");
        Ok(msg)
    }

    /// Append an already validated message and invalidate the cursor cache
    /// entries it shifts, atomically.
    pub async fn append(&self, msg: &Message) -> Result<(), StoreError> {
        self.store.append_message(msg, self.invalidation).await
    }

    /// Validate and serve one page.
    pub async fn pull(&self, cmd: PullCommand) -> Result<Page, ServiceError> {
        let params = validation::pull(&cmd.chat, cmd.cursor, cmd.limit)?;
        let direction = Direction::from_reverse(cmd.reverse);
        let page = self
            .paginator
            .pull(&params.chat_id, params.cursor, params.limit, direction)
            .await
            .inspect_err(|e| {
                error!(
                    error = %e,
                    chat_id = %params.chat_id,
                    %direction,
                    cursor = params.cursor,
                    "failed to pull messages"
                );
            })?;
        Ok(page)
    }
}

/// Current UTC time in microseconds since the Unix epoch.
pub fn now_micros() -> i64 {
    Utc::now().timestamp_micros()
}
