//! Basic type definitions for the hub
//!
//! Provides newtype wrappers for type safety:
//! - `Token`: opaque session credential
//! - `ChatroomId`: monotonically allocated chatroom identifier

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session token (newtype pattern)
///
/// Opaque credential identifying one client session.
/// Freshly issued tokens wrap a random UUID v4.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(pub String);

impl Token {
    /// Issue a new random token
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Token {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&str> for Token {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Chatroom identifier
///
/// Allocated from a single counter starting at 1, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatroomId(pub u64);

impl std::fmt::Display for ChatroomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
