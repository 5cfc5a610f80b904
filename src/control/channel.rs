//! The server end of the control channel

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;
use tracing::{debug, trace, warn};

use crate::error::BoardError;

/// One inbound datagram
#[derive(Debug)]
pub(crate) struct Datagram {
    pub(crate) peer: SocketAddr,
    /// `None` if the payload was not UTF-8
    pub(crate) text: Option<String>,
}

/// The server's UDP socket and its receive buffer
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub struct ControlChannel {
    socket: UdpSocket,
    buf: Vec<u8>,
}

impl ControlChannel {
    /// Wraps a bound socket. Datagrams longer than `max_datagram` are truncated.
    #[must_use]
    pub fn new(socket: UdpSocket, max_datagram: usize) -> Self {
        Self {
            socket,
            buf: vec![0; max_datagram],
        }
    }

    /// The address the socket is bound to
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Sends one reply datagram.
    ///
    /// Send failures are logged, not returned: a peer we cannot reach is not our problem.
    pub(crate) async fn send(&self, peer: SocketAddr, text: &str) {
        trace!("-> {peer}: {text:?}");
        if let Err(e) = self.socket.send_to(text.as_bytes(), peer).await {
            warn!("failed to send reply to {peer}: {e}");
        }
    }

    /// Waits for the next datagram from anyone
    pub(crate) async fn recv(&mut self) -> std::io::Result<Datagram> {
        let (len, peer) = self.socket.recv_from(&mut self.buf).await?;
        let text = std::str::from_utf8(&self.buf[..len])
            .ok()
            .map(|s| s.trim().to_string());
        debug!("<- {peer}: {text:?}");
        Ok(Datagram { peer, text })
    }

    /// Waits for the next datagram from `peer`, for at most `timeout` (if given).
    ///
    /// Anyone else who writes in the meantime is told the server is busy; their datagram is dropped.
    pub(crate) async fn recv_from_peer(
        &mut self,
        peer: SocketAddr,
        timeout: Option<Duration>,
    ) -> Result<String, BoardError> {
        let wait = async {
            loop {
                let dgram = self.recv().await?;
                if dgram.peer == peer {
                    return Ok(dgram.text.unwrap_or_default());
                }
                debug!("{} is busy-waiting for {peer}", dgram.peer);
                self.send(dgram.peer, &BoardError::Busy.to_string()).await;
            }
        };
        match timeout {
            Some(d) => tokio::time::timeout(d, wait)
                .await
                .map_err(|_| BoardError::LoginTimeout)?,
            None => wait.await,
        }
    }
}
