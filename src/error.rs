//! Error types for the hub
//!
//! Defines operation-level errors returned by the registries and
//! connection-level errors raised by the WebSocket front end.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

use crate::types::ChatroomId;

/// Operation errors
///
/// Every failure is local to a single operation: the registries stay
/// usable and no partial mutation is left behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HubError {
    /// Token not present in the session registry
    #[error("Invalid token")]
    InvalidToken,

    /// Required request field absent
    #[error("Missing parameter: {0}")]
    MissingParameter(&'static str),

    /// Direct message recipient has no active session
    #[error("Recipient not found: {0}")]
    RecipientNotFound(String),

    /// No chatroom with the given id
    #[error("Chatroom not found: {0}")]
    ChatroomNotFound(ChatroomId),

    /// A username in a create-chatroom member list did not resolve
    #[error("Unknown member: {0}")]
    UnknownMember(String),

    /// Another active session already uses this username
    #[error("Username already taken: {0}")]
    UsernameTaken(String),

    /// The token is already registered to a session
    #[error("Token already in use")]
    TokenInUse,
}

/// Connection-level errors
///
/// Fatal to the connection they occur on; operation errors are reported
/// to the peer as error responses instead.
#[derive(Debug, Error)]
pub enum AppError {
    /// WebSocket protocol error (fatal)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON serialization/deserialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
