//! Per-client mailbox
//!
//! Buffers undelivered direct and chatroom messages until the owner polls.
//! Any number of senders append concurrently; draining snapshots and clears
//! both buffers under a single lock acquisition.

use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use crate::types::ChatroomId;

/// Direct message waiting in a mailbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectMessage {
    pub from: String,
    pub text: String,
}

/// Chatroom message waiting in a mailbox
///
/// Stores the chatroom id; the name is looked up when the mailbox is drained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatroomMessage {
    pub chatroom_id: ChatroomId,
    pub from: String,
    pub text: String,
}

/// One entry of a poll result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolledMessage {
    pub from: String,
    pub text: String,
    /// Set for chatroom messages, absent for direct messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chatroom_name: Option<String>,
}

#[derive(Debug, Default)]
struct Buffers {
    direct: Vec<DirectMessage>,
    chatroom: Vec<ChatroomMessage>,
}

/// Message buffer owned by one client
#[derive(Debug, Default)]
pub struct Mailbox {
    buffers: Mutex<Buffers>,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a direct message
    pub fn append_direct(&self, from: impl Into<String>, text: impl Into<String>) {
        self.buffers.lock().direct.push(DirectMessage {
            from: from.into(),
            text: text.into(),
        });
    }

    /// Append a chatroom-tagged message
    pub fn append_chatroom(
        &self,
        chatroom_id: ChatroomId,
        from: impl Into<String>,
        text: impl Into<String>,
    ) {
        self.buffers.lock().chatroom.push(ChatroomMessage {
            chatroom_id,
            from: from.into(),
            text: text.into(),
        });
    }

    /// Number of buffered messages (direct + chatroom)
    pub fn pending(&self) -> usize {
        let buffers = self.buffers.lock();
        buffers.direct.len() + buffers.chatroom.len()
    }

    /// Take everything buffered and clear the mailbox
    ///
    /// Direct messages come first, then chatroom messages, each in append
    /// order. `resolve` maps a chatroom id to its current name; it runs after
    /// the mailbox lock is released, so it may take registry locks. Entries
    /// whose chatroom no longer resolves are dropped.
    pub fn drain<F>(&self, resolve: F) -> Vec<PolledMessage>
    where
        F: Fn(ChatroomId) -> Option<String>,
    {
        let Buffers { direct, chatroom } = std::mem::take(&mut *self.buffers.lock());

        let mut drained = Vec::with_capacity(direct.len() + chatroom.len());
        drained.extend(direct.into_iter().map(|msg| PolledMessage {
            from: msg.from,
            text: msg.text,
            chatroom_name: None,
        }));

        for msg in chatroom {
            match resolve(msg.chatroom_id) {
                Some(name) => drained.push(PolledMessage {
                    from: msg.from,
                    text: msg.text,
                    chatroom_name: Some(name),
                }),
                None => {
                    debug!(
                        "Dropping message from {} for deleted chatroom {}",
                        msg.from, msg.chatroom_id
                    );
                }
            }
        }

        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(id: ChatroomId) -> Option<String> {
        match id.0 {
            1 => Some("team".to_string()),
            2 => Some("ops".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_empty_drain() {
        let mailbox = Mailbox::new();
        assert!(mailbox.drain(names).is_empty());
        assert_eq!(mailbox.pending(), 0);
    }

    #[test]
    fn test_direct_before_chatroom() {
        let mailbox = Mailbox::new();
        mailbox.append_chatroom(ChatroomId(1), "carol", "group first");
        mailbox.append_direct("alice", "one");
        mailbox.append_chatroom(ChatroomId(2), "dave", "group second");
        mailbox.append_direct("bob", "two");
        assert_eq!(mailbox.pending(), 4);

        let drained = mailbox.drain(names);
        let texts: Vec<&str> = drained.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["one", "two", "group first", "group second"]);
        assert_eq!(drained[0].chatroom_name, None);
        assert_eq!(drained[2].chatroom_name.as_deref(), Some("team"));
        assert_eq!(drained[3].chatroom_name.as_deref(), Some("ops"));
    }

    #[test]
    fn test_drain_clears() {
        let mailbox = Mailbox::new();
        mailbox.append_direct("alice", "hi");
        assert_eq!(mailbox.drain(names).len(), 1);
        assert!(mailbox.drain(names).is_empty());
    }

    #[test]
    fn test_unresolved_chatroom_dropped() {
        let mailbox = Mailbox::new();
        mailbox.append_chatroom(ChatroomId(1), "carol", "kept");
        mailbox.append_chatroom(ChatroomId(99), "carol", "gone");
        mailbox.append_direct("alice", "direct");

        let drained = mailbox.drain(names);
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].text, "direct");
        assert_eq!(drained[1].text, "kept");
        assert_eq!(mailbox.pending(), 0);
    }

    #[test]
    fn test_polled_message_serialize() {
        let direct = PolledMessage {
            from: "alice".to_string(),
            text: "hi".to_string(),
            chatroom_name: None,
        };
        let json = serde_json::to_string(&direct).unwrap();
        assert!(!json.contains("chatroom_name"));

        let group = PolledMessage {
            chatroom_name: Some("team".to_string()),
            ..direct
        };
        let json = serde_json::to_string(&group).unwrap();
        assert!(json.contains("\"chatroom_name\":\"team\""));
    }
}
