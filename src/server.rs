//! Server event loop

use std::net::SocketAddr;

use anyhow::Context as _;
use tokio::net::UdpSocket;
use tracing::{debug, error, info};

use crate::auth::{CredentialStore, FileCredentials};
use crate::config::Configuration;
use crate::control::{Board, ControlChannel};
use crate::store::ThreadStore;

/// A bound board server
#[derive(Debug)]
pub struct Server {
    board: Board,
    channel: ControlChannel,
}

impl Server {
    /// Opens storage and binds the control socket to `bind_address:port`.
    ///
    /// Credentials come from the configured credential file.
    pub async fn bind(config: Configuration, port: u16) -> anyhow::Result<Self> {
        config.try_validate()?;
        let credentials = FileCredentials::new(config.credentials_path());
        Self::bind_with(config, port, Box::new(credentials)).await
    }

    /// As [`bind`](Self::bind), with a caller-supplied credential store
    pub async fn bind_with(
        config: Configuration,
        port: u16,
        credentials: Box<dyn CredentialStore>,
    ) -> anyhow::Result<Self> {
        let store = ThreadStore::open(&config.data_dir)
            .await
            .with_context(|| format!("opening data directory {}", config.data_dir.display()))?;
        let addr = SocketAddr::new(config.bind_address, port);
        let socket = UdpSocket::bind(addr)
            .await
            .with_context(|| format!("binding control socket to {addr}"))?;
        let channel = ControlChannel::new(socket, config.max_datagram);
        debug!("{}", config.format_server_config());
        debug!("credentials: {credentials:?}");
        Ok(Self {
            board: Board::new(config, store, credentials),
            channel,
        })
    }

    /// The control socket's address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.channel.local_addr()
    }

    /// Server state, for inspection
    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Serves requests, one datagram at a time, until the socket fails
    pub async fn run(&mut self) -> anyhow::Result<()> {
        info!(
            "board server listening on UDP {}, data in {}",
            self.local_addr()?,
            self.board.store().root().display()
        );
        loop {
            let dgram = match self.channel.recv().await {
                Ok(d) => d,
                // ICMP port-unreachable from a vanished peer surfaces here on some platforms
                Err(e) if e.kind() == std::io::ErrorKind::ConnectionReset => {
                    debug!("ignoring {e}");
                    continue;
                }
                Err(e) => {
                    error!("control socket failed: {e}");
                    return Err(e).context("receiving from control socket");
                }
            };
            self.board.handle(&mut self.channel, dgram).await;
        }
    }
}
