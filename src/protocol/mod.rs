//! # Board wire protocol
//!
//! ## Control channel
//!
//! The control channel is UDP. Every request is one datagram of UTF-8 text and, apart from the
//! transfer and login exchanges below, is answered by exactly one reply datagram.
//! Nothing is retransmitted; the client simply waits for its reply.
//!
//! A request is a keyword followed by space-separated arguments. The last argument of
//! `MSG` and `EDT` is free text running to the end of the datagram.
//!
//! ```text
//! LST
//! XIT
//! CRT <title>
//! RDT <title>
//! RMV <title>
//! MSG <title> <text...>
//! DLT <title> <number>
//! UPD <title> <filename>
//! DWN <title> <filename>
//! EDT <title> <number> <text...>
//! ```
//!
//! Replies are plain text. Multi-line replies (`LST`, `RDT`) are newline-joined.
//! Every failure reply begins with [`ERROR_MARKER`].
//!
//! ## Login
//!
//! The literal request `login` starts a handshake. Each step is one datagram in each direction:
//!
//! ```text
//! C→S  login
//! S→C  user credentials request
//! C→S  <identity>
//! S→C  user already logged in                 (terminal)
//!    | password request
//!         C→S  <secret>
//!         S→C  login success | login failed   (terminal)
//!    | new user
//!         C→S  <secret>
//!         S→C  registered and logged in       (terminal)
//! ```
//!
//! Every other request needs a session, which is keyed by the peer's address.
//!
//! ## Transfers
//!
//! `UPD` and `DWN` move file contents over a short-lived TCP connection:
//!
//! 1. The server checks the request; a failure is replied as usual and nothing else happens.
//! 2. The server binds a TCP listener and replies `PORT <n>`.
//! 3. The client connects to `<server address>:<n>`.
//! 4. The sender (client for `UPD`, server for `DWN`) writes the raw file bytes, then closes.
//! 5. The server replies with a final acknowledgement (or failure) on the control channel.

mod command;
pub use command::{Command, Keyword};

/// Starts a login handshake
pub const LOGIN: &str = "login";
/// Server asks for the identity
pub const CREDENTIALS_REQUEST: &str = "user credentials request";
/// Server asks for the secret of a known identity
pub const SECRET_REQUEST: &str = "password request";
/// Server asks for a secret to register an unknown identity with
pub const NEW_IDENTITY: &str = "new user";
/// Handshake succeeded for a known identity
pub const LOGIN_SUCCESS: &str = "login success";
/// Handshake failed: wrong secret, or a token that cannot be stored
pub const LOGIN_FAILED: &str = "login failed";
/// Handshake refused: the identity is logged in elsewhere
pub const ALREADY_ACTIVE: &str = "user already logged in";
/// Handshake succeeded for a newly registered identity
pub const REGISTERED: &str = "registered and logged in";
/// Reply to a successful `XIT`
pub const GOODBYE: &str = "Goodbye!";
/// Every failure reply starts with this
pub const ERROR_MARKER: &str = "Error:";

const PORT_PREFIX: &str = "PORT ";

/// Formats the transfer port announcement
#[must_use]
pub fn port_announcement(port: u16) -> String {
    format!("{PORT_PREFIX}{port}")
}

/// Recognises a transfer port announcement
#[must_use]
pub fn parse_port_announcement(reply: &str) -> Option<u16> {
    reply.trim().strip_prefix(PORT_PREFIX)?.trim().parse().ok()
}

/// Is this reply a failure?
#[must_use]
pub fn is_error(reply: &str) -> bool {
    reply.starts_with(ERROR_MARKER)
}
