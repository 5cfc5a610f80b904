//! Interactive client front end

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr as _;

use anyhow::Result;
use indicatif::MultiProgress;
use strum::IntoEnumIterator as _;
use tracing::debug;

use super::{progress_bar_for, Client, LoginOutcome, Reply};
use crate::cli::styles::{ERROR, HEADER, RESET, SUCCESS};
use crate::protocol::{Command, Keyword, GOODBYE};

/// Line-by-line front end for a [`Client`].
///
/// Reads operator input from `input` and writes prompts and replies to `output`.
#[derive(Debug)]
pub struct Repl<R, W> {
    client: Client,
    input: R,
    output: W,
    display: MultiProgress,
    quiet: bool,
    download_dir: PathBuf,
}

/// Reads one trimmed line, or `None` at end of input
fn prompt_line<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    prompt: &str,
) -> Result<Option<String>> {
    write!(output, "{prompt}")?;
    output.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

impl<R: BufRead, W: Write> Repl<R, W> {
    /// Creates a front end. Downloads land in the current directory.
    #[must_use]
    pub fn new(client: Client, input: R, output: W, display: MultiProgress, quiet: bool) -> Self {
        Self {
            client,
            input,
            output,
            display,
            quiet,
            download_dir: PathBuf::from("."),
        }
    }

    /// Sets where downloads are written
    #[must_use]
    pub fn with_download_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.download_dir = dir.into();
        self
    }

    fn help(&mut self) -> Result<()> {
        writeln!(self.output, "{HEADER}Available commands:{RESET}")?;
        for kw in Keyword::iter() {
            writeln!(self.output, "  {}", kw.usage())?;
        }
        Ok(())
    }

    fn show(&mut self, reply: &Reply) -> Result<()> {
        if reply.is_error() {
            writeln!(self.output, "{ERROR}{reply}{RESET}")?;
        } else {
            writeln!(self.output, "{reply}")?;
        }
        Ok(())
    }

    /// Runs the session: login, then commands until `XIT` or end of input.
    ///
    /// Returns `false` if input ended before a login succeeded.
    pub async fn run(&mut self) -> Result<bool> {
        if !self.login().await? {
            return Ok(false);
        }
        self.help()?;
        loop {
            let Some(line) = prompt_line(&mut self.input, &mut self.output, "> ")? else {
                // end of input is as good as XIT
                let reply = self.client.request(&Keyword::Xit.to_string()).await?;
                self.show(&reply)?;
                return Ok(true);
            };
            if line.is_empty() {
                continue;
            }
            if line.eq_ignore_ascii_case("help") {
                self.help()?;
                continue;
            }
            match self.command(&line).await {
                Ok(reply) => {
                    self.show(&reply)?;
                    if reply.text() == GOODBYE {
                        return Ok(true);
                    }
                }
                // a local problem; the session carries on
                Err(e) => writeln!(self.output, "{ERROR}Error:{RESET} {e:#}")?,
            }
        }
    }

    /// Prompts until a login succeeds. `false` means input ended first.
    async fn login(&mut self) -> Result<bool> {
        loop {
            let Some(identity) = prompt_line(&mut self.input, &mut self.output, "Enter username: ")?
            else {
                return Ok(false);
            };
            if identity.is_empty() {
                continue;
            }
            let Self {
                client,
                input,
                output,
                ..
            } = self;
            let outcome = client
                .login_with(&identity, |kind| {
                    prompt_line(input, output, &format!("{kind}: "))?
                        .ok_or_else(|| anyhow::anyhow!("input ended during login"))
                })
                .await?;
            debug!("login as {identity}: {outcome:?}");
            match outcome {
                LoginOutcome::LoggedIn => {
                    writeln!(self.output, "{SUCCESS}Welcome to the forum, {identity}.{RESET}")?;
                }
                LoginOutcome::Registered => writeln!(
                    self.output,
                    "{SUCCESS}Registered {identity}. Welcome to the forum.{RESET}"
                )?,
                LoginOutcome::AlreadyActive => {
                    writeln!(self.output, "{ERROR}{identity} has already logged in.{RESET}")?;
                }
                LoginOutcome::Failed => writeln!(self.output, "{ERROR}Invalid password.{RESET}")?,
            }
            if outcome.is_success() {
                return Ok(true);
            }
        }
    }

    /// Runs one operator command. Transfers are handled here; everything else goes to the server as typed.
    async fn command(&mut self, line: &str) -> Result<Reply> {
        Ok(match Command::from_str(line) {
            Ok(Command::Upload { title, filename }) => {
                let path = Path::new(&filename);
                let len = std::fs::metadata(path).ok().as_ref().map(std::fs::Metadata::len);
                let bar = progress_bar_for(
                    &self.display,
                    &format!("{title}/{filename}"),
                    len,
                    self.quiet,
                )?;
                self.client.upload(&title, path, &bar).await?
            }
            Ok(Command::Download { title, filename }) => {
                let bar = progress_bar_for(
                    &self.display,
                    &format!("{title}/{filename}"),
                    None,
                    self.quiet,
                )?;
                self.client
                    .download(&title, &filename, &self.download_dir, &bar)
                    .await?
            }
            _ => self.client.request(line).await?,
        })
    }
}
