//! Session registry
//!
//! Owns every active `Client`, indexed by token and by username.
//! Both indexes live behind one mutex so they never disagree.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use crate::client::Client;
use crate::error::HubError;
use crate::types::Token;

#[derive(Debug, Default)]
struct Sessions {
    /// Token -> Client
    by_token: HashMap<Token, Arc<Client>>,
    /// Username -> Token
    by_username: HashMap<String, Token>,
}

impl Sessions {
    fn remove(&mut self, token: &Token) -> Option<Arc<Client>> {
        let client = self.by_token.remove(token)?;
        self.by_username.remove(client.username());
        client.mark_removed();
        Some(client)
    }
}

/// Registry of active client sessions
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<Sessions>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session, active as of now
    ///
    /// Fails if the username or the token already belongs to an active session.
    pub fn register(&self, username: &str, token: Token) -> Result<Arc<Client>, HubError> {
        self.register_at(username, token, Instant::now())
    }

    /// Register a new session with an explicit last-activity instant
    pub fn register_at(
        &self,
        username: &str,
        token: Token,
        at: Instant,
    ) -> Result<Arc<Client>, HubError> {
        let mut sessions = self.sessions.lock();

        if sessions.by_username.contains_key(username) {
            return Err(HubError::UsernameTaken(username.to_string()));
        }
        if sessions.by_token.contains_key(&token) {
            return Err(HubError::TokenInUse);
        }

        let client = Arc::new(Client::with_activity(username, token.clone(), at));
        sessions
            .by_username
            .insert(username.to_string(), token.clone());
        sessions.by_token.insert(token, Arc::clone(&client));

        debug!("Total sessions: {}", sessions.by_token.len());
        Ok(client)
    }

    /// Remove the session holding `token`
    ///
    /// Returns the removed client, or `None` if the token was unknown.
    pub fn unregister(&self, token: &Token) -> Option<Arc<Client>> {
        self.sessions.lock().remove(token)
    }

    pub fn find_by_token(&self, token: &Token) -> Option<Arc<Client>> {
        self.sessions.lock().by_token.get(token).cloned()
    }

    pub fn find_by_username(&self, username: &str) -> Option<Arc<Client>> {
        let sessions = self.sessions.lock();
        sessions
            .by_username
            .get(username)
            .and_then(|token| sessions.by_token.get(token))
            .cloned()
    }

    /// Resolve a token, failing with `InvalidToken` if it is not registered
    pub fn authenticate(&self, token: &Token) -> Result<Arc<Client>, HubError> {
        self.find_by_token(token).ok_or(HubError::InvalidToken)
    }

    /// Remove every client idle longer than `ttl` as of `now`
    ///
    /// Returns the removed clients.
    pub fn sweep_expired(&self, now: Instant, ttl: Duration) -> Vec<Arc<Client>> {
        let mut sessions = self.sessions.lock();

        let expired: Vec<Token> = sessions
            .by_token
            .values()
            .filter(|client| client.is_expired(now, ttl))
            .map(|client| client.token().clone())
            .collect();

        expired
            .iter()
            .filter_map(|token| sessions.remove(token))
            .collect()
    }

    /// Usernames of all active sessions, sorted
    pub fn usernames(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sessions.lock().by_username.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().by_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_find() {
        let registry = SessionRegistry::new();
        let client = registry.register("alice", Token::from("t1")).unwrap();

        let by_token = registry.find_by_token(&Token::from("t1")).unwrap();
        let by_name = registry.find_by_username("alice").unwrap();
        assert!(Arc::ptr_eq(&client, &by_token));
        assert!(Arc::ptr_eq(&client, &by_name));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let registry = SessionRegistry::new();
        registry.register("alice", Token::from("t1")).unwrap();

        assert_eq!(
            registry.register("alice", Token::from("t2")).unwrap_err(),
            HubError::UsernameTaken("alice".to_string())
        );
        assert_eq!(
            registry.register("bob", Token::from("t1")).unwrap_err(),
            HubError::TokenInUse
        );
        assert_eq!(registry.len(), 1);
        assert!(registry.find_by_username("bob").is_none());
    }

    #[test]
    fn test_unregister() {
        let registry = SessionRegistry::new();
        registry.register("alice", Token::from("t1")).unwrap();

        let removed = registry.unregister(&Token::from("t1")).unwrap();
        assert!(removed.is_removed());
        assert!(registry.unregister(&Token::from("t1")).is_none());
        assert!(registry.find_by_username("alice").is_none());
        assert_eq!(
            registry.authenticate(&Token::from("t1")).unwrap_err(),
            HubError::InvalidToken
        );

        // Username is free again
        registry.register("alice", Token::from("t2")).unwrap();
    }

    #[test]
    fn test_sweep_expired() {
        let registry = SessionRegistry::new();
        let start = Instant::now();
        let ttl = Duration::from_secs(3600);

        registry.register_at("idle", Token::from("t-idle"), start).unwrap();
        registry
            .register_at("busy", Token::from("t-busy"), start + Duration::from_secs(1800))
            .unwrap();

        let removed = registry.sweep_expired(start + Duration::from_secs(3601), ttl);
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].username(), "idle");
        assert!(removed[0].is_removed());
        assert!(!registry.find_by_username("busy").unwrap().is_removed());
        assert_eq!(registry.usernames(), vec!["busy".to_string()]);

        // Removed client stays usable for existing holders
        removed[0].mailbox().append_direct("x", "y");
        assert_eq!(removed[0].mailbox().pending(), 1);
    }

    #[test]
    fn test_usernames_sorted() {
        let registry = SessionRegistry::new();
        registry.register("carol", Token::generate()).unwrap();
        registry.register("alice", Token::generate()).unwrap();
        registry.register("bob", Token::generate()).unwrap();
        assert_eq!(registry.usernames(), vec!["alice", "bob", "carol"]);
    }
}
