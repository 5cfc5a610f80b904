//! Socket wrangling

use std::net::{IpAddr, SocketAddr};
use tokio::net::TcpListener;
use tracing::{debug, trace};

use super::PortRange;
use crate::error::BoardError;

/// Binds a TCP listener for a single transfer.
///
/// Candidates are drawn at random from `range`, up to `attempts` times.
/// Draws are independent, so a port may be tried twice; this is a best-effort pool, not a reservation system.
/// A range of `0` asks the OS to choose.
pub(crate) async fn bind_transfer_listener(
    addr: IpAddr,
    range: PortRange,
    attempts: u16,
) -> Result<TcpListener, BoardError> {
    for attempt in 1..=attempts {
        let port = range.random_port(&mut rand::thread_rng());
        match TcpListener::bind(SocketAddr::new(addr, port)).await {
            Ok(listener) => {
                let bound = listener.local_addr().map_or(port, |a| a.port());
                debug!("bound transfer listener to TCP port {bound} (attempt {attempt})");
                return Ok(listener);
            }
            Err(e) => trace!("port {port} unavailable: {e}"),
        }
    }
    debug!("no transfer port available in {range} after {attempts} attempts");
    Err(BoardError::PortExhausted)
}
