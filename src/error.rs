//! Board protocol failures
//!
//! Every failure a handler can report to a peer is a [`BoardError`].
//! The `Display` form of each variant is exactly the text sent back over the control channel,
//! so a handler only has to return `Err(..)` and the dispatcher takes care of the reply.

use crate::protocol::Keyword;

/// Failures recovered at the handler boundary and converted into a single reply datagram.
#[derive(Debug, thiserror::Error)]
#[allow(clippy::module_name_repetitions)]
pub enum BoardError {
    /// The sender has no active session and tried something other than `login`.
    #[error("Error: Please login first using: login")]
    AuthRequired,
    /// The identity already has an active session on some other address.
    #[error("user already logged in")]
    AlreadyActive,
    /// Wrong secret, or an identity/secret that cannot be stored.
    #[error("login failed")]
    LoginFailed,
    /// The peer went quiet part-way through the login handshake.
    #[error("Error: Timed out waiting for login response.")]
    LoginTimeout,
    /// Wrong number of arguments for a recognised command.
    #[error("Error: Invalid {0} format.")]
    Format(Keyword),
    /// A message number argument was not an integer (an optional `-` then digits).
    #[error("Error: Message number must be an integer.")]
    NotANumber,
    /// A thread title that cannot be used as a storage key.
    #[error("Error: Invalid thread title '{0}'.")]
    InvalidTitle(String),
    /// An attachment name that cannot be used as part of a storage key.
    #[error("Error: Invalid file name '{0}'.")]
    InvalidFilename(String),
    /// No such thread.
    #[error("Error: Thread '{0}' does not exist.")]
    ThreadNotFound(String),
    /// No such attachment on an existing thread.
    #[error("Error: File '{filename}' was not found in thread '{title}'.")]
    AttachmentNotFound {
        /// Thread title
        title: String,
        /// Attachment name
        filename: String,
    },
    /// CRT of a title that is already taken.
    #[error("Error: Thread '{0}' already exists.")]
    ThreadExists(String),
    /// UPD of an attachment that is already present.
    #[error("Error: File '{filename}' already uploaded to thread '{title}'.")]
    AttachmentExists {
        /// Thread title
        title: String,
        /// Attachment name
        filename: String,
    },
    /// The caller is not the author of the message they tried to change.
    #[error("Error: You can only {0} your own message.")]
    NotAuthor(MessageAction),
    /// The caller is not the creator of the thread they tried to remove.
    #[error("Error: Only the thread creator can remove it.")]
    NotCreator,
    /// Message number outside `1..=count`.
    #[error("Error: Invalid message number.")]
    InvalidNumber,
    /// No transfer listener could be bound within the attempt budget.
    #[error("Error: no available port")]
    PortExhausted,
    /// The peer did not connect (or finish) within the transfer timeout.
    #[error("Error: Timed out waiting for file transfer.")]
    TransferTimeout,
    /// The stream channel failed part-way.
    #[error("Error: File transfer failed: {0}")]
    TransferIo(#[source] std::io::Error),
    /// Unknown command keyword.
    #[error("Error: Unrecognized command.")]
    Unrecognized,
    /// Someone else is mid-handshake; the control loop cannot serve this peer right now.
    #[error("Error: Server busy, please retry.")]
    Busy,
    /// Unexpected filesystem fault in the storage layer.
    #[error("Error: Internal server error.")]
    Storage(#[from] std::io::Error),
    /// A thread record that does not follow the line format.
    #[error("Error: Internal server error.")]
    CorruptThread {
        /// Thread title
        title: String,
        /// 0-based line index
        line: usize,
    },
}

/// The two message mutations that are restricted to the author
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum MessageAction {
    /// DLT
    Delete,
    /// EDT
    Edit,
}

impl BoardError {
    /// Is this a fault on our side (as opposed to something the peer did)?
    ///
    /// Internal faults are logged in full; the peer only sees a generic message.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::CorruptThread { .. })
    }
}
