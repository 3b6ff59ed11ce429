//! Outbound connection establishment with a two-tier timeout budget.
//!
//! The hard ceiling bounds the whole attempt (name resolution included).
//! The soft budget, when set, bounds each individual address so that one
//! black-holed address does not eat the entire ceiling.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::net::{lookup_host, TcpStream};
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::transport::Transport;

/// Connection timeout budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timeouts {
    /// Per-address budget.
    pub soft: Option<Duration>,
    /// Overall ceiling.
    pub hard: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Timeouts {
            soft: None,
            hard: Duration::from_secs(30),
        }
    }
}

/// Why an outbound connection could not be established.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Name resolution failed.
    #[error("cannot resolve {host}: {source}")]
    Resolve {
        /// Host that failed to resolve.
        host: String,
        /// Resolver error.
        #[source]
        source: io::Error,
    },

    /// Resolution returned nothing.
    #[error("no addresses for {0}")]
    NoAddresses(String),

    /// Every address was tried and the last one failed.
    #[error("connect to {addr} failed: {source}")]
    Failed {
        /// Last address tried.
        addr: SocketAddr,
        /// Error for that address.
        #[source]
        source: io::Error,
    },

    /// The hard ceiling expired.
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
}

/// Connect to `host:port` within `timeouts`.
pub async fn connect(
    host: &str,
    port: u16,
    timeouts: Timeouts,
) -> Result<Transport<TcpStream>, ConnectError> {
    let deadline = Instant::now() + timeouts.hard;

    let addrs: Vec<SocketAddr> = timeout_at(deadline, lookup_host((host, port)))
        .await
        .map_err(|_| ConnectError::TimedOut(timeouts.hard))?
        .map_err(|source| ConnectError::Resolve {
            host: host.to_owned(),
            source,
        })?
        .collect();

    let mut last_error = None;
    for addr in &addrs {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        let budget = timeouts.soft.map_or(remaining, |soft| soft.min(remaining));

        debug!(%addr, ?budget, "Connecting upstream");
        match timeout(budget, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => {
                info!(%addr, "Connected upstream");
                if let Err(e) = stream.set_nodelay(true) {
                    warn!(%addr, error = %e, "Failed to set TCP_NODELAY");
                }
                return Ok(Transport::tcp(stream));
            }
            Ok(Err(source)) => {
                debug!(%addr, error = %source, "Upstream address failed");
                last_error = Some(ConnectError::Failed {
                    addr: *addr,
                    source,
                });
            }
            Err(_) => {
                debug!(%addr, "Upstream address timed out");
                last_error = Some(ConnectError::Failed {
                    addr: *addr,
                    source: io::Error::from(io::ErrorKind::TimedOut),
                });
            }
        }
    }

    if Instant::now() >= deadline {
        return Err(ConnectError::TimedOut(timeouts.hard));
    }
    Err(last_error.unwrap_or_else(|| ConnectError::NoAddresses(host.to_owned())))
}
