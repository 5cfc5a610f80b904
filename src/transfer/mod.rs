//! Attachment transfers over short-lived TCP connections
//!
//! Each `UPD` or `DWN` gets its own listener, drawn from the configured port pool.
//! The listener accepts exactly one connection, from the same IP address as the requesting peer,
//! and is dropped once the transfer completes, fails or times out.
//!
//! Uploads are written to a staging file and only renamed into place once the client has closed
//! its end of the connection, so a partial upload never appears as an attachment.

use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

use human_repr::{HumanCount as _, HumanDuration as _};
use tokio::io::{AsyncWriteExt as _, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::control::{Board, ControlChannel};
use crate::error::BoardError;
use crate::protocol::port_announcement;
use crate::store::{check_filename, check_title, Entry};
use crate::util::socket::bind_transfer_listener;

/// Runs `fut` under the transfer deadline, if there is one
async fn with_deadline<T, F>(deadline: Option<Duration>, fut: F) -> Result<T, BoardError>
where
    F: Future<Output = Result<T, BoardError>>,
{
    match deadline {
        Some(d) => tokio::time::timeout(d, fut)
            .await
            .map_err(|_| BoardError::TransferTimeout)?,
        None => fut.await,
    }
}

/// Accepts the first connection from `expected`; anyone else is turned away
async fn accept_from(listener: &TcpListener, expected: IpAddr) -> Result<TcpStream, BoardError> {
    loop {
        let (stream, from) = listener.accept().await.map_err(BoardError::TransferIo)?;
        if from.ip() == expected {
            debug!("transfer connection from {from}");
            return Ok(stream);
        }
        warn!("refused transfer connection from {from}, expecting {expected}");
        drop(stream);
    }
}

impl Board {
    /// Binds a listener and tells the peer where it is
    async fn open_transfer_port(
        &self,
        channel: &ControlChannel,
        peer: SocketAddr,
    ) -> Result<TcpListener, BoardError> {
        let listener = bind_transfer_listener(
            self.config.bind_address,
            self.config.transfer_ports,
            self.config.port_attempts,
        )
        .await?;
        let port = listener.local_addr()?.port();
        channel.send(peer, &port_announcement(port)).await;
        Ok(listener)
    }

    /// `UPD`: receives an attachment from `peer` and records it in the thread.
    pub(crate) async fn upload(
        &self,
        channel: &ControlChannel,
        peer: SocketAddr,
        identity: &str,
        title: &str,
        filename: &str,
    ) -> Result<String, BoardError> {
        check_title(title)?;
        check_filename(filename)?;
        if !self.store.exists(title).await? {
            return Err(BoardError::ThreadNotFound(title.into()));
        }
        if self.store.attachment_exists(title, filename).await? {
            return Err(BoardError::AttachmentExists {
                title: title.into(),
                filename: filename.into(),
            });
        }

        let listener = self.open_transfer_port(channel, peer).await?;
        let staging = self.store.staging_path(title, filename);
        let chunk = self.config.chunk_size;
        let start = Instant::now();

        let received = with_deadline(self.config.transfer_timeout_duration(), async {
            let stream = accept_from(&listener, peer.ip()).await?;
            let mut reader = BufReader::with_capacity(chunk, stream);
            let mut file = tokio::fs::File::create(&staging)
                .await
                .map_err(BoardError::TransferIo)?;
            let bytes = tokio::io::copy_buf(&mut reader, &mut file)
                .await
                .map_err(BoardError::TransferIo)?;
            file.flush().await.map_err(BoardError::TransferIo)?;
            Ok(bytes)
        })
        .await;
        drop(listener);

        let bytes = match received {
            Ok(b) => b,
            Err(e) => {
                let _ = tokio::fs::remove_file(&staging).await;
                warn!("upload of {filename} to {title} from {identity} failed: {e}");
                return Err(e);
            }
        };
        if let Err(e) =
            tokio::fs::rename(&staging, self.store.attachment_path(title, filename)).await
        {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(e.into());
        }
        self.store
            .append(
                title,
                &Entry::Upload {
                    uploader: identity.into(),
                    filename: filename.into(),
                },
            )
            .await?;

        info!(
            "{identity} uploaded {filename} to {title}: {} in {}",
            bytes.human_count_bytes(),
            start.elapsed().human_duration()
        );
        Ok(format!(
            "File '{filename}' uploaded to thread '{title}' successfully."
        ))
    }

    /// `DWN`: sends an attachment to `peer`.
    pub(crate) async fn download(
        &self,
        channel: &ControlChannel,
        peer: SocketAddr,
        identity: &str,
        title: &str,
        filename: &str,
    ) -> Result<String, BoardError> {
        check_title(title)?;
        check_filename(filename)?;
        if !self.store.exists(title).await? {
            return Err(BoardError::ThreadNotFound(title.into()));
        }
        let not_found = || BoardError::AttachmentNotFound {
            title: title.into(),
            filename: filename.into(),
        };
        if !self.store.attachment_exists(title, filename).await? {
            return Err(not_found());
        }
        let file = tokio::fs::File::open(self.store.attachment_path(title, filename))
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => not_found(),
                _ => BoardError::Storage(e),
            })?;

        let listener = self.open_transfer_port(channel, peer).await?;
        let chunk = self.config.chunk_size;
        let start = Instant::now();

        let sent = with_deadline(self.config.transfer_timeout_duration(), async {
            let mut stream = accept_from(&listener, peer.ip()).await?;
            let mut reader = BufReader::with_capacity(chunk, file);
            let bytes = tokio::io::copy_buf(&mut reader, &mut stream)
                .await
                .map_err(BoardError::TransferIo)?;
            stream.shutdown().await.map_err(BoardError::TransferIo)?;
            Ok(bytes)
        })
        .await
        .inspect_err(|e| warn!("download of {filename} from {title} by {identity} failed: {e}"))?;

        info!(
            "{identity} downloaded {filename} from {title}: {} in {}",
            sent.human_count_bytes(),
            start.elapsed().human_duration()
        );
        Ok(format!(
            "File '{filename}' downloaded successfully from thread '{title}'."
        ))
    }
}
