//! Sessions: which peer address is logged in as whom

use std::collections::HashMap;
use std::net::SocketAddr;

use crate::error::BoardError;

/// Maps peer addresses to authenticated identities.
///
/// An identity is bound to at most one address at a time.
/// Sessions last until [`end_session`](Self::end_session); nothing expires them.
#[derive(Debug, Default, Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct SessionRegistry {
    sessions: HashMap<SocketAddr, String>,
}

impl SessionRegistry {
    /// Creates an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `identity` to `peer`.
    ///
    /// Fails with [`BoardError::AlreadyActive`] if the identity is bound to some other address.
    /// Re-binding the same pair is harmless.
    pub fn begin_session(&mut self, peer: SocketAddr, identity: &str) -> Result<(), BoardError> {
        if self
            .sessions
            .iter()
            .any(|(addr, who)| *addr != peer && who == identity)
        {
            return Err(BoardError::AlreadyActive);
        }
        let _ = self.sessions.insert(peer, identity.to_string());
        Ok(())
    }

    /// The identity logged in at `peer`, if any
    #[must_use]
    pub fn is_authenticated(&self, peer: SocketAddr) -> Option<&str> {
        self.sessions.get(&peer).map(String::as_str)
    }

    /// Is `identity` logged in anywhere?
    #[must_use]
    pub fn is_active(&self, identity: &str) -> bool {
        self.sessions.values().any(|who| who == identity)
    }

    /// Ends the session at `peer`, returning who it was. Ending a non-existent session is not an error.
    pub fn end_session(&mut self, peer: SocketAddr) -> Option<String> {
        self.sessions.remove(&peer)
    }

    /// Number of active sessions
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Are there no active sessions?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
