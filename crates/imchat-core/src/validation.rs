//! Stateless request checks run before anything touches storage.

use crate::chat_id::ChatId;
use crate::entities::Message;
use crate::error::ValidationError;

/// Validates an incoming message and builds the row to store.
///
/// Checks run in order: chat id shape, sender membership, text (trimmed,
/// must not be blank), send time. The stored chat id is canonical and the
/// receiver is the participant that is not the sender.
pub fn message(
    chat: &str,
    sender: &str,
    text: &str,
    send_time: i64,
) -> Result<Message, ValidationError> {
    let chat_id = ChatId::parse(chat)?;
    let receiver = match chat_id.counterpart(sender) {
        Some(receiver) if receiver != sender => receiver.to_owned(),
        _ => return Err(ValidationError::InvalidSender),
    };

    let text = text.trim();
    if text.is_empty() {
        return Err(ValidationError::InvalidMessage);
    }

    let sent_at = u64::try_from(send_time).map_err(|_| ValidationError::InvalidSendTime)?;

    Ok(Message {
        chat_id,
        sender: sender.to_owned(),
        receiver,
        text: text.to_owned(),
        sent_at,
    })
}

/// Validated pull parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullParams {
    pub chat_id: ChatId,
    pub cursor: u64,
    /// Zero still means "default page size".
    pub limit: u32,
}

/// Validates the chat id, then the limit, then the cursor.
pub fn pull(chat: &str, cursor: i64, limit: i32) -> Result<PullParams, ValidationError> {
    let chat_id = ChatId::parse(chat)?;
    let limit = u32::try_from(limit).map_err(|_| ValidationError::InvalidLimit)?;
    let cursor = u64::try_from(cursor).map_err(|_| ValidationError::InvalidCursor)?;
    Ok(PullParams {
        chat_id,
        cursor,
        limit,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn message_is_canonicalised_and_trimmed() {
        let msg = message("b:a", "b", "  hi there \n", 42).unwrap();
        assert_eq!(msg.chat_id.as_str(), "a:b");
        assert_eq!(msg.sender, "b");
        assert_eq!(msg.receiver, "a");
        assert_eq!(msg.text, "hi there");
        assert_eq!(msg.sent_at, 42);
    }

    #[test]
    fn message_rules_in_order() {
        assert_eq!(message("", "", "", 0), Err(ValidationError::InvalidChatId));
        assert_eq!(message("a:b:c", "a", "hi", 0), Err(ValidationError::InvalidChatId));
        assert_eq!(message("a:b", "c", "hi", 0), Err(ValidationError::InvalidSender));
        assert_eq!(message("a:b", "a", "   ", 0), Err(ValidationError::InvalidMessage));
        assert_eq!(message("a:b", "a", "hi", -1), Err(ValidationError::InvalidSendTime));
        // Sender is checked before text, text before send time.
        assert_eq!(message("a:b", "c", "", -1), Err(ValidationError::InvalidSender));
        assert_eq!(message("a:b", "a", "", -1), Err(ValidationError::InvalidMessage));
    }

    #[test]
    fn self_chat_has_no_receiver() {
        assert_eq!(message("a:a", "a", "hi", 1), Err(ValidationError::InvalidSender));
    }

    #[test]
    fn pull_rules_in_order() {
        assert_eq!(pull("nope", -1, -1), Err(ValidationError::InvalidChatId));
        assert_eq!(pull("a:b", -1, -1), Err(ValidationError::InvalidLimit));
        assert_eq!(pull("a:b", -1, 0), Err(ValidationError::InvalidCursor));

        let params = pull("b:a", 0, 0).unwrap();
        assert_eq!(params.chat_id.as_str(), "a:b");
        assert_eq!((params.cursor, params.limit), (0, 0));
    }
}
