//! Gateway - TCP listener that serves one client at a time.
//!
//! Clients that connect while a session is running wait in the listen
//! backlog until it ends.

use std::future::Future;
use std::io;
use std::net::SocketAddr;

use anyhow::Context as _;
use tokio::net::{TcpListener, TcpSocket};
use tracing::{Instrument, info, instrument, warn};

use super::session::Session;
use crate::config::Config;
use crate::handlers::Registry;
use crate::telemetry::{DumpFlag, spans};

/// Pending connections queued while a session is active.
const LISTEN_BACKLOG: u32 = 4;

/// The Gateway accepts clients and runs their sessions in turn.
pub struct Gateway {
    listener: TcpListener,
    config: Config,
    registry: Registry,
    dump: DumpFlag,
}

impl Gateway {
    /// Bind the gateway to the configured listen address.
    pub async fn bind(config: Config, dump: DumpFlag) -> anyhow::Result<Self> {
        let listener = listen(config.listen)
            .with_context(|| format!("failed to listen on {}", config.listen))?;
        info!(addr = %listener.local_addr()?, upstream = %config.server, "Listener bound");

        Ok(Self {
            listener,
            config,
            registry: Registry::new(),
            dump,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept and serve clients until `shutdown` resolves, or after the
    /// first session when respawn is off.
    #[instrument(skip_all, name = "gateway")]
    pub async fn run<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let (stream, peer) = tokio::select! {
                accepted = self.listener.accept() => accepted.context("failed to accept client")?,
                () = &mut shutdown => return Ok(()),
            };
            if let Err(e) = stream.set_nodelay(true) {
                warn!(%peer, error = %e, "Failed to set TCP_NODELAY");
            }
            info!(%peer, "Client accepted");

            let session = Session::new(stream, peer, &self.registry, &self.config, self.dump.clone());
            tokio::select! {
                result = session.run().instrument(spans::session(peer)) => match result {
                    Ok(()) => info!(%peer, "Session ended"),
                    Err(e) => warn!(%peer, code = e.error_code(), error = %e, "Session ended with error"),
                },
                () = &mut shutdown => return Ok(()),
            }

            if !self.config.respawn {
                info!("Respawn disabled, exiting");
                return Ok(());
            }
        }
    }
}

fn listen(addr: SocketAddr) -> io::Result<TcpListener> {
    let socket = match addr {
        SocketAddr::V4(_) => TcpSocket::new_v4()?,
        SocketAddr::V6(_) => TcpSocket::new_v6()?,
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(LISTEN_BACKLOG)
}
