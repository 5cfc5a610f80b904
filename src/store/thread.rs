//! In-memory model of a thread record
//!
//! A thread record is a text file. Line 0 holds the creator's identity.
//! Every following line is either a numbered message, `<n> <author>: <text>`,
//! or an upload audit line, `<identity> uploaded <filename>`.
//!
//! Message numbers are positional among message lines only.
//! Audit lines are never numbered and keep their place when messages around them are renumbered.

use std::fmt::Display;

use tracing::warn;

use crate::error::{BoardError, MessageAction};

/// Marker word for upload audit lines
const UPLOADED: &str = "uploaded";

/// A numbered message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// 1-based position among the thread's messages
    pub number: usize,
    /// Identity of the poster
    pub author: String,
    /// Message body
    pub text: String,
}

impl Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}: {}", self.number, self.author, self.text)
    }
}

/// One line of a thread after the creator line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// A numbered message
    Message(Message),
    /// Audit record of a successful upload
    Upload {
        /// Identity of the uploader
        uploader: String,
        /// Attachment name
        filename: String,
    },
}

impl Display for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Entry::Message(m) => m.fmt(f),
            Entry::Upload { uploader, filename } => write!(f, "{uploader} {UPLOADED} {filename}"),
        }
    }
}

impl Entry {
    fn parse(line: &str) -> Option<Self> {
        if let Some(m) = Self::parse_message(line) {
            return Some(Entry::Message(m));
        }
        let mut words = line.split_whitespace();
        match (words.next(), words.next(), words.next(), words.next()) {
            (Some(uploader), Some(UPLOADED), Some(filename), None) => Some(Entry::Upload {
                uploader: uploader.into(),
                filename: filename.into(),
            }),
            _ => None,
        }
    }

    fn parse_message(line: &str) -> Option<Message> {
        let (number, rest) = line.split_once(' ')?;
        let number = number.parse::<usize>().ok()?;
        let (author, text) = match rest.split_once(": ") {
            Some(pair) => pair,
            None => (rest.strip_suffix(':')?, ""),
        };
        if author.is_empty() || author.contains(char::is_whitespace) {
            return None;
        }
        Some(Message {
            number,
            author: author.into(),
            text: text.into(),
        })
    }
}

/// Line breaks would split a message across records
fn flatten(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

/// A thread, as held in memory between load and save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thread {
    title: String,
    creator: String,
    entries: Vec<Entry>,
}

impl Thread {
    /// A brand new thread with no messages
    #[must_use]
    pub fn new(title: &str, creator: &str) -> Self {
        Self {
            title: title.into(),
            creator: creator.into(),
            entries: Vec::new(),
        }
    }

    /// Parses a stored record.
    ///
    /// Message numbers that disagree with their position are corrected here;
    /// the next rewrite persists the corrected numbers.
    pub fn parse(title: &str, record: &str) -> Result<Self, BoardError> {
        let corrupt = |line| BoardError::CorruptThread {
            title: title.into(),
            line,
        };
        let mut lines = record.lines();
        let creator = lines
            .next()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| corrupt(0))?;
        let mut thread = Self::new(title, creator);
        for (i, line) in lines.enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let entry = Entry::parse(line).ok_or_else(|| corrupt(i + 1))?;
            thread.entries.push(entry);
        }
        let mut expected = 0;
        for entry in &mut thread.entries {
            if let Entry::Message(m) = entry {
                expected += 1;
                if m.number != expected {
                    warn!(
                        "thread {title}: message stored as {} is at position {expected}",
                        m.number
                    );
                    m.number = expected;
                }
            }
        }
        Ok(thread)
    }

    /// Renders the full record, creator line first
    #[must_use]
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(64 * (self.entries.len() + 1));
        out.push_str(&self.creator);
        out.push('\n');
        for e in &self.entries {
            out.push_str(&e.to_string());
            out.push('\n');
        }
        out
    }

    /// Thread title
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Identity recorded on line 0
    #[must_use]
    pub fn creator(&self) -> &str {
        &self.creator
    }

    /// All lines after the creator line, in order
    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Number of messages (not counting audit lines)
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, Entry::Message(_)))
            .count()
    }

    /// Appends a message and returns the entry as stored
    pub fn post(&mut self, author: &str, text: &str) -> &Entry {
        let number = self.message_count() + 1;
        self.entries.push(Entry::Message(Message {
            number,
            author: author.into(),
            text: flatten(text),
        }));
        &self.entries[self.entries.len() - 1]
    }

    /// Appends an upload audit line and returns the entry as stored
    pub fn record_upload(&mut self, uploader: &str, filename: &str) -> &Entry {
        self.entries.push(Entry::Upload {
            uploader: uploader.into(),
            filename: filename.into(),
        });
        &self.entries[self.entries.len() - 1]
    }

    /// Finds the entry index of message `number`, checking that `caller` wrote it
    fn locate_own(
        &self,
        number: i64,
        caller: &str,
        action: MessageAction,
    ) -> Result<usize, BoardError> {
        let wanted = usize::try_from(number)
            .ok()
            .filter(|n| (1..=self.message_count()).contains(n))
            .ok_or(BoardError::InvalidNumber)?;
        let (index, message) = self
            .entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| match e {
                Entry::Message(m) => Some((i, m)),
                Entry::Upload { .. } => None,
            })
            .nth(wanted - 1)
            .ok_or(BoardError::InvalidNumber)?;
        if message.author != caller {
            return Err(BoardError::NotAuthor(action));
        }
        Ok(index)
    }

    /// Removes message `number` and shifts every later message down by one
    pub fn delete(&mut self, number: i64, caller: &str) -> Result<Message, BoardError> {
        let index = self.locate_own(number, caller, MessageAction::Delete)?;
        let Entry::Message(removed) = self.entries.remove(index) else {
            return Err(BoardError::InvalidNumber);
        };
        for entry in &mut self.entries[index..] {
            if let Entry::Message(m) = entry {
                m.number -= 1;
            }
        }
        Ok(removed)
    }

    /// Replaces the text of message `number`, keeping its number and author
    pub fn edit(&mut self, number: i64, caller: &str, text: &str) -> Result<&Message, BoardError> {
        let index = self.locate_own(number, caller, MessageAction::Edit)?;
        match &mut self.entries[index] {
            Entry::Message(m) => {
                m.text = flatten(text);
                Ok(&*m)
            }
            Entry::Upload { .. } => Err(BoardError::InvalidNumber),
        }
    }

    /// The RDT reply: every line after the creator, or the empty-thread notice
    #[must_use]
    pub fn render(&self) -> String {
        if self.entries.is_empty() {
            return format!("Thread '{}' has no messages.", self.title);
        }
        self.entries
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
