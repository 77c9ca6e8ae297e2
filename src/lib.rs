//! In-memory Polling Chat Hub Library
//!
//! Authenticated sessions exchange direct messages and take part in named
//! chatrooms. Nothing is pushed: messages wait in a per-client mailbox until
//! the client polls, and a poll drains the mailbox.
//!
//! # Features
//! - Token-based sessions with idle expiry
//! - Direct messages by username
//! - Chatrooms with creator-gated deletion and fan-out broadcast
//! - Drain-and-clear polling (direct messages first, then chatroom messages)
//! - JSON request/response over WebSocket
//!
//! # Architecture
//! A single `Hub` owns two registries and is shared as `Arc<Hub>`:
//! - `SessionRegistry` maps tokens and usernames to `Client`s
//! - `ChatroomRegistry` allocates chatroom ids and owns membership
//! - Each `Client` owns a `Mailbox`
//!
//! Every collection sits behind its own mutex. The chatroom table lock is
//! taken before a chatroom's member lock, and no registry lock is taken
//! while a mailbox lock is held.
//!
//! # Example
//! ```
//! use poll_hub::Hub;
//!
//! let hub = Hub::new();
//! let alice = hub.login("alice").unwrap();
//! let bob = hub.login("bob").unwrap();
//!
//! hub.send_direct(&alice, "bob", "hi").unwrap();
//! let messages = hub.poll(&bob).unwrap();
//! assert_eq!(messages[0].from, "alice");
//! assert!(hub.poll(&bob).unwrap().is_empty());
//! ```

pub mod chatroom;
pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod hub;
pub mod mailbox;
pub mod message;
pub mod server;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use chatroom::{Chatroom, ChatroomRegistry, ChatroomSummary};
pub use client::Client;
pub use config::Config;
pub use error::{AppError, HubError};
pub use handler::{handle_connection, handle_request};
pub use hub::Hub;
pub use mailbox::{Mailbox, PolledMessage};
pub use message::{ErrorCode, Request, Response};
pub use session::SessionRegistry;
pub use types::{ChatroomId, Token};
