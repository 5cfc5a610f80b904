//! Typed board commands

use std::fmt::Display;
use std::str::FromStr;

use crate::error::BoardError;

/// Command keywords, as they appear on the wire
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::VariantNames,
    strum::EnumIter,
)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Keyword {
    /// Create a thread
    Crt,
    /// Post a message
    Msg,
    /// Delete a message
    Dlt,
    /// Edit a message
    Edt,
    /// List threads
    Lst,
    /// Read a thread
    Rdt,
    /// Upload an attachment
    Upd,
    /// Download an attachment
    Dwn,
    /// Remove a thread
    Rmv,
    /// Log out
    Xit,
}

impl Keyword {
    /// Usage line, for help text
    #[must_use]
    pub fn usage(self) -> &'static str {
        match self {
            Keyword::Crt => "CRT <title>",
            Keyword::Msg => "MSG <title> <message>",
            Keyword::Dlt => "DLT <title> <number>",
            Keyword::Edt => "EDT <title> <number> <message>",
            Keyword::Lst => "LST",
            Keyword::Rdt => "RDT <title>",
            Keyword::Upd => "UPD <title> <filename>",
            Keyword::Dwn => "DWN <title> <filename>",
            Keyword::Rmv => "RMV <title>",
            Keyword::Xit => "XIT",
        }
    }
}

/// A decoded control-channel request (other than `login`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `CRT <title>`
    Create {
        /// Thread title
        title: String,
    },
    /// `MSG <title> <text...>`
    Post {
        /// Thread title
        title: String,
        /// Message body
        text: String,
    },
    /// `DLT <title> <number>`
    Delete {
        /// Thread title
        title: String,
        /// Message number; range checking is the handler's job
        number: i64,
    },
    /// `EDT <title> <number> <text...>`
    Edit {
        /// Thread title
        title: String,
        /// Message number; range checking is the handler's job
        number: i64,
        /// Replacement body
        text: String,
    },
    /// `LST`
    List,
    /// `RDT <title>`
    Read {
        /// Thread title
        title: String,
    },
    /// `UPD <title> <filename>`
    Upload {
        /// Thread title
        title: String,
        /// Attachment name
        filename: String,
    },
    /// `DWN <title> <filename>`
    Download {
        /// Thread title
        title: String,
        /// Attachment name
        filename: String,
    },
    /// `RMV <title>`
    Remove {
        /// Thread title
        title: String,
    },
    /// `XIT`
    Exit,
}

impl Command {
    /// The keyword this command is sent with
    #[must_use]
    pub fn keyword(&self) -> Keyword {
        match self {
            Command::Create { .. } => Keyword::Crt,
            Command::Post { .. } => Keyword::Msg,
            Command::Delete { .. } => Keyword::Dlt,
            Command::Edit { .. } => Keyword::Edt,
            Command::List => Keyword::Lst,
            Command::Read { .. } => Keyword::Rdt,
            Command::Upload { .. } => Keyword::Upd,
            Command::Download { .. } => Keyword::Dwn,
            Command::Remove { .. } => Keyword::Rmv,
            Command::Exit => Keyword::Xit,
        }
    }

    /// The thread this command operates on, if any
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        match self {
            Command::Create { title }
            | Command::Post { title, .. }
            | Command::Delete { title, .. }
            | Command::Edit { title, .. }
            | Command::Read { title }
            | Command::Upload { title, .. }
            | Command::Download { title, .. }
            | Command::Remove { title } => Some(title),
            Command::List | Command::Exit => None,
        }
    }
}

/// Splits off the first whitespace-delimited word
fn next_word(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if s.is_empty() {
        return None;
    }
    Some(match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], s[i..].trim_start()),
        None => (s, ""),
    })
}

/// Exactly `N` whitespace-delimited words
fn exact_words<const N: usize>(args: &str, keyword: Keyword) -> Result<[&str; N], BoardError> {
    let words: Vec<&str> = args.split_whitespace().collect();
    words.try_into().map_err(|_| BoardError::Format(keyword))
}

/// A title and a number, followed by nothing (DLT) or by free text (EDT)
fn title_and_number(args: &str, keyword: Keyword) -> Result<(String, i64, &str), BoardError> {
    let format = || BoardError::Format(keyword);
    let (title, rest) = next_word(args).ok_or_else(format)?;
    let (number, rest) = next_word(rest).ok_or_else(format)?;
    match (keyword, rest.is_empty()) {
        (Keyword::Dlt, true) | (Keyword::Edt, false) => (),
        _ => return Err(format()),
    }
    Ok((title.into(), message_number(number)?, rest))
}

/// An optional `-` followed by ASCII digits
fn message_number(word: &str) -> Result<i64, BoardError> {
    let digits = word.strip_prefix('-').unwrap_or(word);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(BoardError::NotANumber);
    }
    // only overflow gets here; it is still an integer, just not one we hold
    word.parse().map_err(|_| BoardError::InvalidNumber)
}

impl FromStr for Command {
    type Err = BoardError;

    /// Decodes a request. Arity is checked here; everything else is left to the handlers.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (word, args) = next_word(s).ok_or(BoardError::Unrecognized)?;
        let keyword = Keyword::from_str(word).map_err(|_| BoardError::Unrecognized)?;
        Ok(match keyword {
            Keyword::Lst => {
                let [] = exact_words::<0>(args, keyword)?;
                Command::List
            }
            Keyword::Xit => {
                let [] = exact_words::<0>(args, keyword)?;
                Command::Exit
            }
            Keyword::Crt => {
                let [title] = exact_words(args, keyword)?;
                Command::Create {
                    title: title.into(),
                }
            }
            Keyword::Rdt => {
                let [title] = exact_words(args, keyword)?;
                Command::Read {
                    title: title.into(),
                }
            }
            Keyword::Rmv => {
                let [title] = exact_words(args, keyword)?;
                Command::Remove {
                    title: title.into(),
                }
            }
            Keyword::Upd => {
                let [title, filename] = exact_words(args, keyword)?;
                Command::Upload {
                    title: title.into(),
                    filename: filename.into(),
                }
            }
            Keyword::Dwn => {
                let [title, filename] = exact_words(args, keyword)?;
                Command::Download {
                    title: title.into(),
                    filename: filename.into(),
                }
            }
            Keyword::Msg => {
                let (title, text) = next_word(args)
                    .filter(|(_, text)| !text.is_empty())
                    .ok_or(BoardError::Format(keyword))?;
                Command::Post {
                    title: title.into(),
                    text: text.trim_end().into(),
                }
            }
            Keyword::Dlt => {
                let (title, number, _) = title_and_number(args, keyword)?;
                Command::Delete { title, number }
            }
            Keyword::Edt => {
                let (title, number, text) = title_and_number(args, keyword)?;
                Command::Edit {
                    title,
                    number,
                    text: text.trim_end().into(),
                }
            }
        })
    }
}

impl Display for Command {
    /// The wire form of the command
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kw = self.keyword();
        match self {
            Command::List | Command::Exit => write!(f, "{kw}"),
            Command::Create { title } | Command::Read { title } | Command::Remove { title } => {
                write!(f, "{kw} {title}")
            }
            Command::Post { title, text } => write!(f, "{kw} {title} {text}"),
            Command::Delete { title, number } => write!(f, "{kw} {title} {number}"),
            Command::Edit {
                title,
                number,
                text,
            } => write!(f, "{kw} {title} {number} {text}"),
            Command::Upload { title, filename } | Command::Download { title, filename } => {
                write!(f, "{kw} {title} {filename}")
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Command, Keyword};
    use crate::error::BoardError;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::str::FromStr as _;

    fn parse(s: &str) -> Result<Command, BoardError> {
        Command::from_str(s)
    }

    #[test]
    fn simple() {
        assert_eq!(parse("LST").unwrap(), Command::List);
        assert_eq!(parse("  XIT \n").unwrap(), Command::Exit);
        assert_eq!(
            parse("CRT general").unwrap(),
            Command::Create {
                title: "general".into()
            }
        );
        assert_eq!(
            parse("UPD general photo.jpg").unwrap(),
            Command::Upload {
                title: "general".into(),
                filename: "photo.jpg".into()
            }
        );
    }

    #[test]
    fn free_text() {
        assert_eq!(
            parse("MSG general hello   there, world  ").unwrap(),
            Command::Post {
                title: "general".into(),
                text: "hello   there, world".into()
            }
        );
        assert_eq!(
            parse("EDT general 3 new words here").unwrap(),
            Command::Edit {
                title: "general".into(),
                number: 3,
                text: "new words here".into()
            }
        );
    }

    #[test]
    fn numbers() {
        assert_eq!(
            parse("DLT general -2").unwrap(),
            Command::Delete {
                title: "general".into(),
                number: -2
            }
        );
        assert!(matches!(parse("DLT general two"), Err(BoardError::NotANumber)));
        assert!(matches!(
            parse("EDT general 1.5 text"),
            Err(BoardError::NotANumber)
        ));
        assert!(matches!(
            parse("DLT general 99999999999999999999"),
            Err(BoardError::InvalidNumber)
        ));
    }

    #[rstest]
    #[case("+1")]
    #[case("-")]
    #[case("--1")]
    #[case("1e3")]
    #[case("0x10")]
    #[case("١")]
    fn only_plain_digits_are_numbers(#[case] number: &str) {
        assert!(
            matches!(
                parse(&format!("DLT general {number}")),
                Err(BoardError::NotANumber)
            ),
            "{number:?}"
        );
    }

    #[rstest]
    #[case("LST extra", Keyword::Lst)]
    #[case("XIT now", Keyword::Xit)]
    #[case("CRT", Keyword::Crt)]
    #[case("CRT two words", Keyword::Crt)]
    #[case("RDT", Keyword::Rdt)]
    #[case("RMV a b", Keyword::Rmv)]
    #[case("MSG general", Keyword::Msg)]
    #[case("MSG", Keyword::Msg)]
    #[case("DLT general", Keyword::Dlt)]
    #[case("DLT general 1 2", Keyword::Dlt)]
    #[case("EDT general 1", Keyword::Edt)]
    #[case("UPD general", Keyword::Upd)]
    #[case("DWN general a b", Keyword::Dwn)]
    fn arity(#[case] input: &str, #[case] kw: Keyword) {
        match parse(input) {
            Err(BoardError::Format(k)) => assert_eq!(k, kw),
            other => panic!("{input:?} gave {other:?}"),
        }
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("HELLO")]
    #[case("lst")]
    #[case("login please")]
    fn unrecognised(#[case] input: &str) {
        assert!(matches!(parse(input), Err(BoardError::Unrecognized)));
    }

    #[test]
    fn wire_form_reparses() {
        for cmd in [
            Command::List,
            Command::Exit,
            Command::Remove { title: "t".into() },
            Command::Post {
                title: "t".into(),
                text: "a b c".into(),
            },
            Command::Edit {
                title: "t".into(),
                number: 2,
                text: "x y".into(),
            },
            Command::Download {
                title: "t".into(),
                filename: "f.bin".into(),
            },
        ] {
            assert_eq!(parse(&cmd.to_string()).unwrap(), cmd);
        }
    }

    #[test]
    fn title_accessor() {
        assert_eq!(parse("RDT general").unwrap().title(), Some("general"));
        assert_eq!(Command::List.title(), None);
        assert_eq!(Keyword::Edt.usage(), "EDT <title> <number> <message>");
    }
}
