//! Login and registration handshake

use std::net::SocketAddr;

use tracing::{debug, info};

use super::{Board, ControlChannel};
use crate::auth::is_storable;
use crate::error::BoardError;
use crate::protocol::{CREDENTIALS_REQUEST, LOGIN_SUCCESS, NEW_IDENTITY, REGISTERED, SECRET_REQUEST};

impl Board {
    /// Runs the handshake with `peer` to completion.
    ///
    /// Intermediate prompts are sent from here; the terminal reply is the return value.
    /// While the handshake is in progress, any other peer is told the server is busy.
    pub(crate) async fn login(
        &mut self,
        channel: &mut ControlChannel,
        peer: SocketAddr,
    ) -> Result<&'static str, BoardError> {
        let timeout = self.config.login_timeout_duration();

        channel.send(peer, CREDENTIALS_REQUEST).await;
        let identity = channel.recv_from_peer(peer, timeout).await?;
        if !is_storable(&identity) {
            debug!("{peer} offered an unusable identity {identity:?}");
            return Err(BoardError::LoginFailed);
        }
        if self.sessions.is_active(&identity) {
            info!("{peer} tried to log in as {identity}, who is already logged in");
            return Err(BoardError::AlreadyActive);
        }

        if let Some(secret) = self.credentials.lookup(&identity).await? {
            channel.send(peer, SECRET_REQUEST).await;
            let offered = channel.recv_from_peer(peer, timeout).await?;
            if offered != secret {
                info!("{peer} failed to log in as {identity}");
                return Err(BoardError::LoginFailed);
            }
            self.sessions.begin_session(peer, &identity)?;
            info!("{identity} logged in from {peer}");
            Ok(LOGIN_SUCCESS)
        } else {
            channel.send(peer, NEW_IDENTITY).await;
            let secret = channel.recv_from_peer(peer, timeout).await?;
            if !is_storable(&secret) {
                debug!("{peer} offered an unusable secret for {identity}");
                return Err(BoardError::LoginFailed);
            }
            self.credentials.register(&identity, &secret).await?;
            self.sessions.begin_session(peer, &identity)?;
            info!("{identity} registered and logged in from {peer}");
            Ok(REGISTERED)
        }
    }
}
