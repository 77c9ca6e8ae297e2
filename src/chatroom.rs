//! Chatrooms and the chatroom registry
//!
//! A chatroom is a named group with a creator and an ordered member set.
//! The registry allocates ids and owns every chatroom.
//!
//! Lock order: the registry table lock is always taken before a chatroom's
//! member lock, and neither is held while appending to a mailbox.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info};

use crate::client::Client;
use crate::error::HubError;
use crate::types::ChatroomId;

/// Point-in-time view of a chatroom
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatroomSummary {
    pub id: ChatroomId,
    pub name: String,
    pub members: Vec<String>,
    pub creator: String,
}

/// Named group chat
#[derive(Debug)]
pub struct Chatroom {
    id: ChatroomId,
    name: String,
    /// Only consulted to authorize deletion
    creator: Arc<Client>,
    /// Insertion-ordered, no client appears twice
    members: Mutex<Vec<Arc<Client>>>,
}

impl Chatroom {
    fn new(id: ChatroomId, name: String, creator: Arc<Client>, members: Vec<Arc<Client>>) -> Self {
        let mut unique: Vec<Arc<Client>> = Vec::with_capacity(members.len());
        for member in members {
            if !unique.iter().any(|m| Arc::ptr_eq(m, &member)) {
                unique.push(member);
            }
        }
        Self {
            id,
            name,
            creator,
            members: Mutex::new(unique),
        }
    }

    pub fn id(&self) -> ChatroomId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn creator(&self) -> &Client {
        &self.creator
    }

    /// Member usernames in join order
    pub fn member_names(&self) -> Vec<String> {
        self.members
            .lock()
            .iter()
            .map(|m| m.username().to_string())
            .collect()
    }

    pub fn contains(&self, client: &Client) -> bool {
        self.members.lock().iter().any(|m| std::ptr::eq(m.as_ref(), client))
    }

    /// Add a member unless already present
    ///
    /// Returns false if the client was already a member.
    fn add_member(&self, client: &Arc<Client>) -> bool {
        let mut members = self.members.lock();
        if members.iter().any(|m| Arc::ptr_eq(m, client)) {
            return false;
        }
        members.push(Arc::clone(client));
        true
    }

    /// Remove a member by identity
    ///
    /// Returns false if the client was not a member.
    fn remove_member(&self, client: &Client) -> bool {
        let mut members = self.members.lock();
        let before = members.len();
        members.retain(|m| !std::ptr::eq(m.as_ref(), client));
        members.len() != before
    }

    /// Append one message to every current member's mailbox
    ///
    /// The member list is snapshotted on entry; joins and leaves that race
    /// with the fan-out apply to the next broadcast. Returns the number of
    /// mailboxes written.
    pub fn send(&self, from: &str, text: &str) -> usize {
        let recipients: Vec<Arc<Client>> = self.members.lock().clone();
        for member in &recipients {
            member.mailbox().append_chatroom(self.id, from, text);
        }
        recipients.len()
    }

    pub fn summary(&self) -> ChatroomSummary {
        ChatroomSummary {
            id: self.id,
            name: self.name.clone(),
            members: self.member_names(),
            creator: self.creator.username().to_string(),
        }
    }
}

#[derive(Debug, Default)]
struct ChatroomTable {
    last_id: u64,
    /// Ordered by id, which is creation order
    rooms: BTreeMap<ChatroomId, Arc<Chatroom>>,
}

/// Registry of all chatrooms
#[derive(Debug, Default)]
pub struct ChatroomRegistry {
    table: Mutex<ChatroomTable>,
}

impl ChatroomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and register a chatroom, returning its id
    ///
    /// The creator is a member only if listed in `members`. Members whose
    /// session has already been removed are skipped. Id allocation and
    /// insertion happen under one lock, so an allocated id is always lookupable.
    pub fn create(
        &self,
        name: impl Into<String>,
        mut members: Vec<Arc<Client>>,
        creator: Arc<Client>,
    ) -> ChatroomId {
        let mut table = self.table.lock();
        // Checked under the table lock so eviction cannot run in between
        members.retain(|member| !member.is_removed());
        table.last_id += 1;
        let id = ChatroomId(table.last_id);

        let chatroom = Arc::new(Chatroom::new(id, name.into(), creator, members));
        for member in chatroom.members.lock().iter() {
            member.note_joined(id);
        }

        info!(
            "Client {} created chatroom {} ({})",
            chatroom.creator.username(),
            id,
            chatroom.name
        );
        table.rooms.insert(id, chatroom);
        id
    }

    pub fn find_by_id(&self, id: ChatroomId) -> Result<Arc<Chatroom>, HubError> {
        self.table
            .lock()
            .rooms
            .get(&id)
            .cloned()
            .ok_or(HubError::ChatroomNotFound(id))
    }

    /// Current name of a chatroom, if it still exists
    pub fn name_of(&self, id: ChatroomId) -> Option<String> {
        self.table.lock().rooms.get(&id).map(|room| room.name.clone())
    }

    /// Add `client` to the members (idempotent), returning the member usernames
    ///
    /// Fails with `InvalidToken` if the client's session was removed after
    /// the caller resolved it.
    pub fn join(&self, id: ChatroomId, client: &Arc<Client>) -> Result<Vec<String>, HubError> {
        let table = self.table.lock();
        let chatroom = table.rooms.get(&id).ok_or(HubError::ChatroomNotFound(id))?;
        if client.is_removed() {
            return Err(HubError::InvalidToken);
        }

        if chatroom.add_member(client) {
            client.note_joined(id);
            debug!("Client {} joined chatroom {}", client.username(), id);
        }
        Ok(chatroom.member_names())
    }

    /// Remove `client` from the members; no-op if absent or unknown id
    pub fn leave(&self, id: ChatroomId, client: &Client) {
        let table = self.table.lock();
        if let Some(chatroom) = table.rooms.get(&id) {
            if chatroom.remove_member(client) {
                debug!("Client {} left chatroom {}", client.username(), id);
            }
        }
        client.note_left(id);
    }

    /// Delete a chatroom if `requester` created it
    ///
    /// A non-creator or unknown id leaves everything untouched. Returns
    /// whether a chatroom was removed.
    pub fn delete(&self, id: ChatroomId, requester: &Client) -> bool {
        let mut table = self.table.lock();
        let Some(chatroom) = table.rooms.get(&id) else {
            debug!(
                "Ignoring delete of unknown chatroom {} by {}",
                id,
                requester.username()
            );
            return false;
        };
        if chatroom.creator.username() != requester.username() {
            debug!(
                "Ignoring delete of chatroom {} by non-creator {}",
                id,
                requester.username()
            );
            return false;
        }

        if let Some(chatroom) = table.rooms.remove(&id) {
            for member in chatroom.members.lock().iter() {
                member.note_left(id);
            }
        }
        info!("Client {} deleted chatroom {}", requester.username(), id);
        true
    }

    pub fn list_members(&self, id: ChatroomId) -> Result<Vec<String>, HubError> {
        let table = self.table.lock();
        let chatroom = table.rooms.get(&id).ok_or(HubError::ChatroomNotFound(id))?;
        Ok(chatroom.member_names())
    }

    /// Fan a message out to every member of the chatroom
    ///
    /// Returns the number of mailboxes written.
    pub fn broadcast(&self, id: ChatroomId, from: &str, text: &str) -> Result<usize, HubError> {
        // Registry lock is released before any mailbox is touched
        let chatroom = self.find_by_id(id)?;
        let delivered = chatroom.send(from, text);
        debug!("{} broadcast to chatroom {} ({} members)", from, id, delivered);
        Ok(delivered)
    }

    /// Snapshot of every chatroom in creation order
    pub fn list(&self) -> Vec<ChatroomSummary> {
        self.table.lock().rooms.values().map(|room| room.summary()).collect()
    }

    /// Remove `client` from every chatroom it is a member of
    pub fn evict(&self, client: &Client) {
        let table = self.table.lock();
        for chatroom in table.rooms.values() {
            chatroom.remove_member(client);
        }
    }

    pub fn len(&self) -> usize {
        self.table.lock().rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
