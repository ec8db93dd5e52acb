use thiserror::Error;

/// Input rejected before it reaches storage.
///
/// The `Display` text is what callers see, so it stays short and stable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A `Send` request arrived without a message body.
    #[error("invalid message")]
    InvalidMessage,

    /// The chat id does not split into exactly two non-empty participants.
    #[error("invalid chat id")]
    InvalidChatId,

    /// The sender is not one of the two chat participants.
    #[error("invalid sender")]
    InvalidSender,

    /// The declared send time is negative.
    #[error("invalid send time")]
    InvalidSendTime,

    /// The page size is negative.
    #[error("invalid limit")]
    InvalidLimit,

    /// The cursor is negative.
    #[error("invalid cursor")]
    InvalidCursor,
}

impl ValidationError {
    /// Result code reported on the service boundary.
    pub fn code(&self) -> i32 {
        match self {
            ValidationError::InvalidMessage
            | ValidationError::InvalidChatId
            | ValidationError::InvalidSender
            | ValidationError::InvalidSendTime => 1,
            ValidationError::InvalidLimit => 2,
            ValidationError::InvalidCursor => 3,
        }
    }
}

/// Failures raised by a message store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Propagated from sqlx (connectivity, constraint, decode).
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Pending migrations could not be applied.
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// An unsigned value does not fit the signed 64-bit storage column.
    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: u64 },

    /// A stored integer is negative where the domain requires unsigned.
    #[error("corrupt {field} in storage: {value}")]
    Corrupt { field: &'static str, value: i64 },
}

/// Error returned by [`crate::service::ChatService`].
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Message shown to callers for any internal failure.
pub const GENERIC_FAILURE: &str = "something went wrong...";

impl ServiceError {
    /// Non-zero result code for the `{code, message}` envelope.
    pub fn code(&self) -> i32 {
        match self {
            ServiceError::Validation(e) => e.code(),
            ServiceError::Store(_) => -1,
        }
    }

    /// Caller-facing text. Store detail never leaves the process.
    pub fn client_message(&self) -> String {
        match self {
            ServiceError::Validation(e) => e.to_string(),
            ServiceError::Store(_) => GENERIC_FAILURE.to_owned(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ServiceError::Validation(_))
    }
}
