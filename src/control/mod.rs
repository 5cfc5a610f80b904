//! Server-side control channel handling
//!
//! The server works through one datagram at a time. Each datagram is:
//!
//! 1. `login`, which starts the handshake, or
//! 2. checked against the session registry, then
//! 3. decoded into a [`Command`](crate::protocol::Command) and routed to its handler.
//!
//! Every outcome, success or [`BoardError`](crate::error::BoardError), ends in exactly one reply.

mod channel;
mod dispatch;
mod handlers;
mod login;

pub use channel::ControlChannel;
pub(crate) use channel::Datagram;

use crate::auth::{CredentialStore, SessionRegistry};
use crate::config::Configuration;
use crate::store::ThreadStore;

/// Everything the server knows: configuration, storage, credentials and sessions
#[derive(Debug)]
pub struct Board {
    pub(crate) config: Configuration,
    pub(crate) store: ThreadStore,
    pub(crate) credentials: Box<dyn CredentialStore>,
    pub(crate) sessions: SessionRegistry,
}

impl Board {
    /// Assembles a board with no active sessions
    #[must_use]
    pub fn new(
        config: Configuration,
        store: ThreadStore,
        credentials: Box<dyn CredentialStore>,
    ) -> Self {
        Self {
            config,
            store,
            credentials,
            sessions: SessionRegistry::new(),
        }
    }

    /// Current sessions
    #[must_use]
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Thread storage
    #[must_use]
    pub fn store(&self) -> &ThreadStore {
        &self.store
    }
}
