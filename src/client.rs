//! Client struct definition
//!
//! Represents an authenticated session with its mailbox and activity clock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::mailbox::{Mailbox, PolledMessage};
use crate::types::{ChatroomId, Token};

/// Active client session
///
/// Shared as `Arc<Client>` between the session registry, chatroom member
/// lists and in-flight operations. A client removed from the registry stays
/// valid for whoever still holds it.
#[derive(Debug)]
pub struct Client {
    username: String,
    token: Token,
    last_activity: Mutex<Instant>,
    mailbox: Mailbox,
    /// Chatrooms this client joined; the chatroom member list is authoritative
    joined: Mutex<Vec<ChatroomId>>,
    /// Set once the session leaves the registry; never cleared
    removed: AtomicBool,
}

impl Client {
    /// Create a new client, active as of now
    pub fn new(username: impl Into<String>, token: Token) -> Self {
        Self::with_activity(username, token, Instant::now())
    }

    /// Create a new client with an explicit last-activity instant
    pub fn with_activity(username: impl Into<String>, token: Token, at: Instant) -> Self {
        Self {
            username: username.into(),
            token,
            last_activity: Mutex::new(at),
            mailbox: Mailbox::new(),
            joined: Mutex::new(Vec::new()),
            removed: AtomicBool::new(false),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    pub fn last_activity(&self) -> Instant {
        *self.last_activity.lock()
    }

    /// Record activity at `now`
    pub fn touch(&self, now: Instant) {
        *self.last_activity.lock() = now;
    }

    /// Check whether the client has been idle longer than `ttl` at `now`
    pub fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.last_activity()) > ttl
    }

    /// Drain the mailbox and mark the client active
    pub fn drain_mailbox<F>(&self, resolve: F) -> Vec<PolledMessage>
    where
        F: Fn(ChatroomId) -> Option<String>,
    {
        let messages = self.mailbox.drain(resolve);
        self.touch(Instant::now());
        messages
    }

    /// Whether the session was logged out or swept
    ///
    /// A removed client may still be held by in-flight operations, but must
    /// not be added to any chatroom.
    pub fn is_removed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }

    pub(crate) fn mark_removed(&self) {
        self.removed.store(true, Ordering::Release);
    }

    /// Chatroom ids this client has joined (hint)
    pub fn joined_chatrooms(&self) -> Vec<ChatroomId> {
        self.joined.lock().clone()
    }

    pub(crate) fn note_joined(&self, id: ChatroomId) {
        let mut joined = self.joined.lock();
        if !joined.contains(&id) {
            joined.push(id);
        }
    }

    pub(crate) fn note_left(&self, id: ChatroomId) {
        self.joined.lock().retain(|joined| *joined != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = Client::new("alice", Token::from("t-alice"));

        assert_eq!(client.username(), "alice");
        assert_eq!(client.token().as_str(), "t-alice");
        assert_eq!(client.mailbox().pending(), 0);
        assert!(client.joined_chatrooms().is_empty());
        assert!(!client.is_removed());
    }

    #[test]
    fn test_mark_removed() {
        let client = Client::new("alice", Token::generate());
        client.mark_removed();
        assert!(client.is_removed());
    }

    #[test]
    fn test_client_expiry() {
        let start = Instant::now();
        let client = Client::with_activity("alice", Token::generate(), start);
        let ttl = Duration::from_secs(60);

        assert!(!client.is_expired(start + Duration::from_secs(60), ttl));
        assert!(client.is_expired(start + Duration::from_secs(61), ttl));

        client.touch(start + Duration::from_secs(61));
        assert!(!client.is_expired(start + Duration::from_secs(100), ttl));
    }

    #[test]
    fn test_drain_touches_activity() {
        let start = Instant::now()
            .checked_sub(Duration::from_secs(5))
            .unwrap();
        let client = Client::with_activity("alice", Token::generate(), start);
        client.mailbox().append_direct("bob", "hi");

        let messages = client.drain_mailbox(|_| None);
        assert_eq!(messages.len(), 1);
        assert!(client.last_activity() > start);
    }

    #[test]
    fn test_joined_hint() {
        let client = Client::new("alice", Token::generate());
        client.note_joined(ChatroomId(1));
        client.note_joined(ChatroomId(1));
        client.note_joined(ChatroomId(2));
        assert_eq!(client.joined_chatrooms(), vec![ChatroomId(1), ChatroomId(2)]);

        client.note_left(ChatroomId(1));
        assert_eq!(client.joined_chatrooms(), vec![ChatroomId(2)]);
    }
}
