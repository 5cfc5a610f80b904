//! Request routing

use std::str::FromStr as _;

use tracing::{debug, error, trace_span, Instrument as _};

use super::{handlers, Board, ControlChannel, Datagram};
use crate::error::BoardError;
use crate::protocol::{Command, GOODBYE, LOGIN};

impl Board {
    /// Handles one datagram, sending exactly one final reply
    pub(crate) async fn handle(&mut self, channel: &mut ControlChannel, dgram: Datagram) {
        let peer = dgram.peer;
        let result = match dgram.text {
            Some(text) if text == LOGIN => self
                .login(channel, peer)
                .instrument(trace_span!("SERVER:LOGIN", %peer))
                .await
                .map(String::from),
            Some(text) => {
                self.serve(channel, peer, &text)
                    .instrument(trace_span!("SERVER", %peer))
                    .await
            }
            None => Err(BoardError::Unrecognized),
        };
        let reply = match result {
            Ok(reply) => reply,
            Err(e) => {
                if e.is_internal() {
                    error!("request from {peer} failed: {e:?}");
                }
                e.to_string()
            }
        };
        channel.send(peer, &reply).await;
    }

    /// Everything except `login`
    async fn serve(
        &mut self,
        channel: &mut ControlChannel,
        peer: std::net::SocketAddr,
        text: &str,
    ) -> Result<String, BoardError> {
        let identity = self
            .sessions
            .is_authenticated(peer)
            .ok_or(BoardError::AuthRequired)?
            .to_string();
        let command = Command::from_str(text)?;
        let store = &self.store;
        let who = identity.as_str();
        debug!(
            "{who}: {} {}",
            command.keyword(),
            command.title().unwrap_or_default()
        );
        match command {
            Command::Create { title } => {
                handlers::create(store, who, &title)
                    .instrument(trace_span!("SERVER:CRT", title))
                    .await
            }
            Command::Post { title, text } => {
                handlers::post(store, who, &title, &text)
                    .instrument(trace_span!("SERVER:MSG", title))
                    .await
            }
            Command::Delete { title, number } => {
                handlers::delete(store, who, &title, number)
                    .instrument(trace_span!("SERVER:DLT", title, number))
                    .await
            }
            Command::Edit {
                title,
                number,
                text,
            } => {
                handlers::edit(store, who, &title, number, &text)
                    .instrument(trace_span!("SERVER:EDT", title, number))
                    .await
            }
            Command::List => handlers::list(store).instrument(trace_span!("SERVER:LST")).await,
            Command::Read { title } => {
                handlers::read(store, &title)
                    .instrument(trace_span!("SERVER:RDT", title))
                    .await
            }
            Command::Remove { title } => {
                handlers::remove(store, who, &title)
                    .instrument(trace_span!("SERVER:RMV", title))
                    .await
            }
            Command::Upload { title, filename } => {
                self.upload(channel, peer, who, &title, &filename)
                    .instrument(trace_span!("SERVER:UPD", title, filename))
                    .await
            }
            Command::Download { title, filename } => {
                self.download(channel, peer, who, &title, &filename)
                    .instrument(trace_span!("SERVER:DWN", title, filename))
                    .await
            }
            Command::Exit => {
                let _ = self.sessions.end_session(peer);
                tracing::info!("{identity} logged out from {peer}");
                Ok(GOODBYE.into())
            }
        }
    }
}
