use imchat_core::{Message, Page, PullCommand, SendCommand};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Text of the envelope on success.
pub const SUCCESS: &str = "success";

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SendRequest {
    /// Two participant names joined by `:`, in either order.
    #[serde(default)]
    pub chat: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub sender: String,
    /// Microseconds since the Unix epoch. Stamped on arrival when absent.
    #[serde(default)]
    pub send_time: Option<i64>,
}

impl From<SendRequest> for SendCommand {
    fn from(req: SendRequest) -> Self {
        SendCommand {
            chat: req.chat,
            sender: req.sender,
            text: req.text,
            send_time: req.send_time,
        }
    }
}

/// `{code, message}` envelope. Also the body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub code: i32,
    pub message: String,
}

impl StatusResponse {
    pub fn success() -> Self {
        Self {
            code: 0,
            message: SUCCESS.to_owned(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct PullQuery {
    #[serde(default)]
    pub chat: String,
    /// Offset into the chat in the requested direction.
    #[serde(default)]
    pub cursor: i64,
    /// Page size; `0` means the server default.
    #[serde(default)]
    pub limit: i32,
    /// Newest first when set.
    #[serde(default)]
    pub reverse: bool,
}

impl From<PullQuery> for PullCommand {
    fn from(q: PullQuery) -> Self {
        PullCommand {
            chat: q.chat,
            cursor: q.cursor,
            limit: q.limit,
            reverse: q.reverse,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MessageBody {
    pub chat: String,
    pub text: String,
    pub sender: String,
    pub send_time: u64,
}

impl From<Message> for MessageBody {
    fn from(m: Message) -> Self {
        MessageBody {
            chat: m.chat_id.to_string(),
            text: m.text,
            sender: m.sender,
            send_time: m.sent_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PullResponse {
    pub code: i32,
    pub message: String,
    pub messages: Vec<MessageBody>,
    pub has_more: bool,
    /// Present only when `has_more` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<u64>,
}

impl From<Page> for PullResponse {
    fn from(page: Page) -> Self {
        PullResponse {
            code: 0,
            message: SUCCESS.to_owned(),
            messages: page.messages.into_iter().map(MessageBody::from).collect(),
            has_more: page.has_more,
            next_cursor: page.next_cursor,
        }
    }
}
