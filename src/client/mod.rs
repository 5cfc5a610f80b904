//! Board client
//!
//! [`Client`] speaks the [wire protocol](crate::protocol) to one server.
//! [`Repl`] puts an interactive front end on it.

mod progress;
mod repl;

pub(crate) use progress::{progress_bar_for, MAX_UPDATE_FPS};
pub use repl::Repl;

use std::fmt::Display;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context as _, Result};
use indicatif::ProgressBar;
use tokio::io::AsyncWriteExt as _;
use tokio::net::{TcpStream, UdpSocket};
use tracing::{debug, trace};

use crate::protocol::{
    self, ALREADY_ACTIVE, CREDENTIALS_REQUEST, LOGIN, LOGIN_FAILED, LOGIN_SUCCESS, NEW_IDENTITY,
    REGISTERED, SECRET_REQUEST,
};

/// How long to wait for any single reply
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(10);

/// Largest reply we expect (an RDT of a busy thread can be long)
const REPLY_BUFFER: usize = 65536;

/// One reply datagram from the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply(String);

impl Reply {
    /// The reply text
    #[must_use]
    pub fn text(&self) -> &str {
        &self.0
    }

    /// Does the reply report a failure?
    #[must_use]
    pub fn is_error(&self) -> bool {
        protocol::is_error(&self.0)
    }

    /// The transfer port, if this is a port announcement
    #[must_use]
    pub fn port(&self) -> Option<u16> {
        protocol::parse_port_announcement(&self.0)
    }
}

impl Display for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the server asked for once it knew the identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum SecretPrompt {
    /// The identity is known; give its secret
    #[strum(to_string = "Enter password")]
    Existing,
    /// The identity is new; choose a secret to register it with
    #[strum(to_string = "New user, enter a password")]
    New,
}

/// How a login handshake ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Logged in as an existing identity
    LoggedIn,
    /// Registered a new identity and logged in
    Registered,
    /// The identity is logged in somewhere else
    AlreadyActive,
    /// Wrong secret, or an unusable identity or secret
    Failed,
}

impl LoginOutcome {
    /// Did we end up with a session?
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, LoginOutcome::LoggedIn | LoginOutcome::Registered)
    }
}

/// A connection to one board server
#[derive(Debug)]
pub struct Client {
    socket: UdpSocket,
    server: SocketAddr,
    reply_timeout: Duration,
}

impl Client {
    /// Binds an ephemeral UDP socket for talking to `server`
    pub async fn connect(server: SocketAddr) -> Result<Self> {
        let local: SocketAddr = if server.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local)
            .await
            .context("binding client socket")?;
        socket
            .connect(server)
            .await
            .with_context(|| format!("connecting to {server}"))?;
        debug!("client bound to {}", socket.local_addr()?);
        Ok(Self {
            socket,
            server,
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
        })
    }

    /// Changes how long to wait for each reply
    #[must_use]
    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }

    /// The server we talk to
    #[must_use]
    pub fn server(&self) -> SocketAddr {
        self.server
    }

    /// Discards anything already waiting, e.g. the late reply to a request we gave up on
    fn drain_stale(&self) {
        let mut buf = [0u8; REPLY_BUFFER];
        while let Ok(n) = self.socket.try_recv(&mut buf) {
            debug!(
                "discarding stale reply {:?}",
                String::from_utf8_lossy(&buf[..n])
            );
        }
    }

    async fn send(&self, text: &str) -> Result<()> {
        trace!("-> {text:?}");
        let _ = self
            .socket
            .send(text.as_bytes())
            .await
            .context("sending request")?;
        Ok(())
    }

    async fn recv(&self) -> Result<Reply> {
        let mut buf = vec![0u8; REPLY_BUFFER];
        let n = tokio::time::timeout(self.reply_timeout, self.socket.recv(&mut buf))
            .await
            .map_err(|_| anyhow::anyhow!("no reply from {} (timed out)", self.server))?
            .context("receiving reply")?;
        let reply = Reply(String::from_utf8_lossy(&buf[..n]).into_owned());
        trace!("<- {:?}", reply.text());
        Ok(reply)
    }

    /// Sends one request and waits for its reply
    pub async fn request(&self, text: &str) -> Result<Reply> {
        self.drain_stale();
        self.send(text).await?;
        self.recv().await
    }

    /// Logs in with a known secret, registering the identity if the server does not know it
    pub async fn login(&self, identity: &str, secret: &str) -> Result<LoginOutcome> {
        self.login_with(identity, |_| Ok(secret.to_string())).await
    }

    /// Logs in, asking `prompt` for the secret once the server has said which kind it wants
    pub async fn login_with<F>(&self, identity: &str, prompt: F) -> Result<LoginOutcome>
    where
        F: FnOnce(SecretPrompt) -> Result<String>,
    {
        let reply = self.request(LOGIN).await?;
        if reply.text() != CREDENTIALS_REQUEST {
            anyhow::bail!("login refused: {reply}");
        }
        let reply = self.request(identity).await?;
        let kind = match reply.text() {
            SECRET_REQUEST => SecretPrompt::Existing,
            NEW_IDENTITY => SecretPrompt::New,
            ALREADY_ACTIVE => return Ok(LoginOutcome::AlreadyActive),
            LOGIN_FAILED => return Ok(LoginOutcome::Failed),
            _ => anyhow::bail!("unexpected reply during login: {reply}"),
        };
        let secret = prompt(kind)?;
        let reply = self.request(&secret).await?;
        Ok(match reply.text() {
            LOGIN_SUCCESS => LoginOutcome::LoggedIn,
            REGISTERED => LoginOutcome::Registered,
            LOGIN_FAILED => LoginOutcome::Failed,
            _ => anyhow::bail!("unexpected reply during login: {reply}"),
        })
    }

    async fn open_stream(&self, port: u16) -> Result<TcpStream> {
        let addr = SocketAddr::new(self.server.ip(), port);
        TcpStream::connect(addr)
            .await
            .with_context(|| format!("connecting to transfer port {addr}"))
    }

    /// Uploads `path` to thread `title`, under the file's own name.
    ///
    /// Local problems are reported as `Err` and nothing is sent.
    /// Otherwise the result is the server's final reply, which may itself report a failure.
    pub async fn upload(&self, title: &str, path: &Path, progress: &ProgressBar) -> Result<Reply> {
        let meta = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("local file {} not found", path.display()))?;
        if !meta.is_file() {
            anyhow::bail!("{} is not a file", path.display());
        }
        let filename = path
            .file_name()
            .and_then(|f| f.to_str())
            .with_context(|| format!("cannot upload {} (unusable file name)", path.display()))?;
        let file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("opening {}", path.display()))?;

        let reply = self.request(&format!("UPD {title} {filename}")).await?;
        let Some(port) = reply.port() else {
            return Ok(reply);
        };
        let mut stream = self.open_stream(port).await?;
        progress.set_length(meta.len());
        let mut source = progress.wrap_async_read(file);
        let sent = tokio::io::copy(&mut source, &mut stream)
            .await
            .context("sending file")?;
        stream.shutdown().await.context("closing transfer stream")?;
        drop(stream);
        progress.finish();
        debug!("sent {sent} bytes");
        self.recv().await
    }

    /// Downloads attachment `filename` of thread `title` into `dest_dir`.
    ///
    /// As with [`upload`](Self::upload), server-side failures come back as an error [`Reply`].
    /// A download the server reports as failed leaves no local file behind.
    pub async fn download(
        &self,
        title: &str,
        filename: &str,
        dest_dir: &Path,
        progress: &ProgressBar,
    ) -> Result<Reply> {
        let local_name = Path::new(filename)
            .file_name()
            .with_context(|| format!("unusable file name {filename}"))?;
        let dest = dest_dir.join(local_name);

        let reply = self.request(&format!("DWN {title} {filename}")).await?;
        let Some(port) = reply.port() else {
            return Ok(reply);
        };
        let mut stream = self.open_stream(port).await?;
        let file = tokio::fs::File::create(&dest)
            .await
            .with_context(|| format!("creating {}", dest.display()))?;
        let mut sink = progress.wrap_async_write(file);
        let received = tokio::io::copy(&mut stream, &mut sink)
            .await
            .context("receiving file");
        let flushed = sink.flush().await.context("writing file");
        drop(sink);
        progress.finish();

        let reply = self.recv().await;
        let failed = received.is_err() || flushed.is_err() || !matches!(&reply, Ok(r) if !r.is_error());
        if failed {
            let _ = tokio::fs::remove_file(&dest).await;
        }
        let bytes = received?;
        flushed?;
        debug!("received {bytes} bytes into {}", dest.display());
        reply
    }
}

#[cfg(test)]
mod test {
    use super::{LoginOutcome, Reply, SecretPrompt};

    #[test]
    fn reply_helpers() {
        let r = Reply("PORT 20001".into());
        assert_eq!(r.port(), Some(20001));
        assert!(!r.is_error());
        let r = Reply("Error: no available port".into());
        assert!(r.is_error());
        assert_eq!(r.port(), None);
        assert_eq!(r.to_string(), "Error: no available port");
    }

    #[test]
    fn outcomes() {
        assert!(LoginOutcome::LoggedIn.is_success());
        assert!(LoginOutcome::Registered.is_success());
        assert!(!LoginOutcome::AlreadyActive.is_success());
        assert!(!LoginOutcome::Failed.is_success());
        assert_eq!(SecretPrompt::New.to_string(), "New user, enter a password");
    }
}
