//! Credential stores
//!
//! **Security caveat:** secrets are stored in clear text and compared by plain equality.
//! This matches the board's wire protocol, which sends them in clear text too.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt as _;
use tracing::{debug, warn};

use crate::error::BoardError;

/// Lookup and registration of identity/secret pairs.
///
/// Implementations do no session bookkeeping; that is the [`SessionRegistry`](super::SessionRegistry)'s job.
#[async_trait]
pub trait CredentialStore: Send + Sync + std::fmt::Debug {
    /// The stored secret for `identity`, if there is one
    async fn lookup(&self, identity: &str) -> Result<Option<String>, BoardError>;
    /// Durably records a new identity
    async fn register(&mut self, identity: &str, secret: &str) -> Result<(), BoardError>;
}

/// Identities and secrets may not be empty or contain whitespace, as records are whitespace-delimited
#[must_use]
pub fn is_storable(token: &str) -> bool {
    !token.is_empty() && !token.contains(char::is_whitespace)
}

/// Credentials kept in a text file, one `identity secret` pair per line.
///
/// The file is re-read on every lookup, so edits made while the server runs take effect.
/// A missing file is an empty store.
#[derive(Debug, Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct FileCredentials {
    path: PathBuf,
}

impl FileCredentials {
    /// Uses the credential file at `path`, which need not exist yet
    #[must_use]
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Location of the credential file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<HashMap<String, String>, BoardError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("credential file {:?} not present", self.path);
                return Ok(HashMap::new());
            }
            Err(e) => return Err(e.into()),
        };
        let mut map = HashMap::new();
        for (i, line) in contents.lines().enumerate() {
            let mut words = line.split_whitespace();
            match (words.next(), words.next(), words.next()) {
                (None, _, _) => (),
                (Some(id), Some(secret), None) => {
                    // first record wins, as registration never overwrites
                    let _ = map.entry(id.to_string()).or_insert_with(|| secret.to_string());
                }
                _ => warn!("{:?} line {}: malformed credential record", self.path, i + 1),
            }
        }
        Ok(map)
    }
}

#[async_trait]
impl CredentialStore for FileCredentials {
    async fn lookup(&self, identity: &str) -> Result<Option<String>, BoardError> {
        Ok(self.read_all().await?.remove(identity))
    }

    async fn register(&mut self, identity: &str, secret: &str) -> Result<(), BoardError> {
        // a file written by hand may lack its final newline
        let needs_newline = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes.last().is_some_and(|b| *b != b'\n'),
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        let record = format!(
            "{}{identity} {secret}\n",
            if needs_newline { "\n" } else { "" }
        );
        file.write_all(record.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Credentials held only in memory
#[derive(Debug, Clone, Default)]
#[allow(clippy::module_name_repetitions)]
pub struct MemoryCredentials {
    records: HashMap<String, String>,
}

impl MemoryCredentials {
    /// Pre-loads some identity/secret pairs
    #[must_use]
    pub fn with<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        Self {
            records: pairs
                .into_iter()
                .map(|(i, s)| (i.to_string(), s.to_string()))
                .collect(),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentials {
    async fn lookup(&self, identity: &str) -> Result<Option<String>, BoardError> {
        Ok(self.records.get(identity).cloned())
    }

    async fn register(&mut self, identity: &str, secret: &str) -> Result<(), BoardError> {
        let _ = self
            .records
            .entry(identity.to_string())
            .or_insert_with(|| secret.to_string());
        Ok(())
    }
}
