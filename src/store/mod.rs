//! Thread storage
//!
//! [`Thread`] is the pure record model: numbering, renumbering and ownership rules.
//! [`ThreadStore`] maps threads and their attachments onto files in one directory.

mod files;
mod thread;

pub use files::ThreadStore;
pub use thread::{Entry, Message, Thread};

use crate::error::BoardError;

/// Can `title` name a thread?
///
/// Titles double as file names, so they may not contain path separators, `.` (which keeps them
/// apart from hidden and staging files and from the credential store), `-` (the attachment key
/// separator) or whitespace.
pub fn check_title(title: &str) -> Result<(), BoardError> {
    let bad = title.is_empty()
        || title
            .chars()
            .any(|c| matches!(c, '-' | '.' | '/' | '\\') || c.is_whitespace() || c.is_control());
    if bad {
        Err(BoardError::InvalidTitle(title.into()))
    } else {
        Ok(())
    }
}

/// Can `filename` name an attachment?
pub fn check_filename(filename: &str) -> Result<(), BoardError> {
    let bad = filename.is_empty()
        || filename == "."
        || filename == ".."
        || filename
            .chars()
            .any(|c| matches!(c, '/' | '\\') || c.is_whitespace() || c.is_control());
    if bad {
        Err(BoardError::InvalidFilename(filename.into()))
    } else {
        Ok(())
    }
}
