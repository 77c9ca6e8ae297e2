//! Message protocol definitions
//!
//! JSON request/response protocol using Serde's tagged enum for type-safe
//! serialization/deserialization. Every request frame produces exactly one
//! response frame.

use serde::{Deserialize, Serialize};

use crate::chatroom::ChatroomSummary;
use crate::error::HubError;
use crate::mailbox::PolledMessage;
use crate::types::{ChatroomId, Token};

/// Client → Server request
///
/// Fields are optional at the wire level so a missing one can be reported
/// as `missing_parameter` rather than a parse failure.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Start a session
    Login { username: Option<String> },
    /// End a session
    Logout { token: Option<Token> },
    /// List active usernames
    ListUsers,
    /// Send a direct message (`username`) or a chatroom message (`chatroom_id`)
    Send {
        token: Option<Token>,
        username: Option<String>,
        chatroom_id: Option<ChatroomId>,
        text: Option<String>,
    },
    /// Drain pending messages
    Poll { token: Option<Token> },
    /// List all chatrooms
    ListChatrooms,
    /// Create a chatroom with an explicit member list
    CreateChatroom {
        token: Option<Token>,
        name: Option<String>,
        members: Option<Vec<String>>,
    },
    /// Join a chatroom
    JoinChatroom {
        token: Option<Token>,
        chatroom_id: Option<ChatroomId>,
    },
    /// Leave a chatroom
    LeaveChatroom {
        token: Option<Token>,
        chatroom_id: Option<ChatroomId>,
    },
    /// Delete a chatroom (creator only)
    DeleteChatroom {
        token: Option<Token>,
        chatroom_id: Option<ChatroomId>,
    },
    /// List chatroom members
    ListMembers {
        token: Option<Token>,
        chatroom_id: Option<ChatroomId>,
    },
}

/// Server → Client response
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Session started
    LoggedIn { username: String, token: Token },
    /// Session ended
    LoggedOut,
    /// Active usernames
    Users { usernames: Vec<String> },
    /// Message accepted
    Sent { delivered: bool },
    /// Drained mailbox contents
    Messages { messages: Vec<PolledMessage> },
    /// All chatrooms
    Chatrooms { chatrooms: Vec<ChatroomSummary> },
    /// Chatroom created
    ChatroomCreated { chatroom_id: ChatroomId },
    /// Current member usernames
    Members {
        chatroom_id: ChatroomId,
        members: Vec<String>,
    },
    /// Leave acknowledged
    LeftChatroom { chatroom_id: ChatroomId },
    /// Delete acknowledged
    ChatroomDeleted { chatroom_id: ChatroomId },
    /// Error occurred
    Error { code: ErrorCode, message: String },
}

/// Error codes for Response::Error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidToken,
    MissingParameter,
    RecipientNotFound,
    ChatroomNotFound,
    UnknownMember,
    UsernameTaken,
    TokenInUse,
    /// Invalid message format
    InvalidMessage,
}

impl Response {
    /// Error response for a frame that could not be parsed
    pub fn invalid_message(err: &serde_json::Error) -> Self {
        Response::Error {
            code: ErrorCode::InvalidMessage,
            message: format!("Invalid message format: {}", err),
        }
    }
}

/// Convert HubError to Response for client notification
impl From<HubError> for Response {
    fn from(err: HubError) -> Self {
        let code = match &err {
            HubError::InvalidToken => ErrorCode::InvalidToken,
            HubError::MissingParameter(_) => ErrorCode::MissingParameter,
            HubError::RecipientNotFound(_) => ErrorCode::RecipientNotFound,
            HubError::ChatroomNotFound(_) => ErrorCode::ChatroomNotFound,
            HubError::UnknownMember(_) => ErrorCode::UnknownMember,
            HubError::UsernameTaken(_) => ErrorCode::UsernameTaken,
            HubError::TokenInUse => ErrorCode::TokenInUse,
        };
        Response::Error {
            code,
            message: err.to_string(),
        }
    }
}
