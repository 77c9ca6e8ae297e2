//! Hub service object
//!
//! Ties the session registry and the chatroom registry together and exposes
//! one method per client-facing operation. Each operation resolves the
//! caller's token first, then reads or mutates the registries and mailboxes,
//! and returns a snapshot.
//!
//! Constructed once at startup and shared as `Arc<Hub>`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::chatroom::{ChatroomRegistry, ChatroomSummary};
use crate::client::Client;
use crate::error::HubError;
use crate::mailbox::PolledMessage;
use crate::session::SessionRegistry;
use crate::types::{ChatroomId, Token};

/// Default idle time after which a session is swept
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(3600);

/// In-memory messaging hub
#[derive(Debug)]
pub struct Hub {
    sessions: SessionRegistry,
    chatrooms: ChatroomRegistry,
    session_ttl: Duration,
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

impl Hub {
    /// Create a hub with empty registries and the default session TTL
    pub fn new() -> Self {
        Self::with_session_ttl(DEFAULT_SESSION_TTL)
    }

    pub fn with_session_ttl(session_ttl: Duration) -> Self {
        Self {
            sessions: SessionRegistry::new(),
            chatrooms: ChatroomRegistry::new(),
            session_ttl,
        }
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn chatrooms(&self) -> &ChatroomRegistry {
        &self.chatrooms
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    /// Start a session for `username` and issue its token
    pub fn login(&self, username: &str) -> Result<Token, HubError> {
        let client = self.sessions.register(username, Token::generate())?;
        info!("Client {} logged in", username);
        Ok(client.token().clone())
    }

    /// End the session holding `token`; no-op if absent
    pub fn logout(&self, token: &Token) {
        if let Some(client) = self.sessions.unregister(token) {
            self.chatrooms.evict(&client);
            info!("Client {} logged out", client.username());
        }
    }

    /// Usernames of all active sessions
    pub fn list_users(&self) -> Vec<String> {
        self.sessions.usernames()
    }

    /// Expire sessions idle longer than the configured TTL as of `now`
    ///
    /// Returns the number of sessions removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let expired = self.sessions.sweep_expired(now, self.session_ttl);
        for client in &expired {
            self.chatrooms.evict(client);
            info!("Client {} expired", client.username());
        }
        debug!(
            "Sweep removed {} sessions, {} remain",
            expired.len(),
            self.sessions.len()
        );
        expired.len()
    }

    /// Deliver a direct message to `recipient`
    pub fn send_direct(&self, token: &Token, recipient: &str, text: &str) -> Result<bool, HubError> {
        let sender = self.sessions.authenticate(token)?;
        let recipient = self
            .sessions
            .find_by_username(recipient)
            .ok_or_else(|| HubError::RecipientNotFound(recipient.to_string()))?;

        recipient.mailbox().append_direct(sender.username(), text);
        debug!("{} -> {}", sender.username(), recipient.username());
        Ok(true)
    }

    /// Broadcast a message to every member of a chatroom
    pub fn send_group(
        &self,
        token: &Token,
        chatroom_id: ChatroomId,
        text: &str,
    ) -> Result<bool, HubError> {
        let sender = self.sessions.authenticate(token)?;
        self.chatrooms.broadcast(chatroom_id, sender.username(), text)?;
        Ok(true)
    }

    /// Drain the caller's mailbox
    pub fn poll(&self, token: &Token) -> Result<Vec<PolledMessage>, HubError> {
        let client = self.sessions.authenticate(token)?;
        Ok(client.drain_mailbox(|id| self.chatrooms.name_of(id)))
    }

    pub fn list_chatrooms(&self) -> Vec<ChatroomSummary> {
        self.chatrooms.list()
    }

    /// Create a chatroom with the listed members
    ///
    /// Every username must resolve to an active session or nothing is created.
    pub fn create_chatroom(
        &self,
        token: &Token,
        name: &str,
        members: &[String],
    ) -> Result<ChatroomId, HubError> {
        let creator = self.sessions.authenticate(token)?;
        let members = members
            .iter()
            .map(|username| {
                self.sessions
                    .find_by_username(username)
                    .ok_or_else(|| HubError::UnknownMember(username.clone()))
            })
            .collect::<Result<Vec<Arc<Client>>, HubError>>()?;

        Ok(self.chatrooms.create(name, members, creator))
    }

    pub fn join_chatroom(
        &self,
        token: &Token,
        chatroom_id: ChatroomId,
    ) -> Result<Vec<String>, HubError> {
        let client = self.sessions.authenticate(token)?;
        self.chatrooms.join(chatroom_id, &client)
    }

    pub fn leave_chatroom(&self, token: &Token, chatroom_id: ChatroomId) -> Result<bool, HubError> {
        let client = self.sessions.authenticate(token)?;
        self.chatrooms.leave(chatroom_id, &client);
        Ok(true)
    }

    /// Delete a chatroom
    ///
    /// Acknowledges even when the caller is not the creator; in that case
    /// the chatroom is left untouched.
    pub fn delete_chatroom(&self, token: &Token, chatroom_id: ChatroomId) -> Result<bool, HubError> {
        let client = self.sessions.authenticate(token)?;
        self.chatrooms.delete(chatroom_id, &client);
        Ok(true)
    }

    pub fn list_members(
        &self,
        token: &Token,
        chatroom_id: ChatroomId,
    ) -> Result<Vec<String>, HubError> {
        self.sessions.authenticate(token)?;
        self.chatrooms.list_members(chatroom_id)
    }
}
