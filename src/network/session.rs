//! Session - one client relayed to one upstream server.
//!
//! ```text
//! Idle ──accept──▶ Connecting ──001──▶ Active ──▶ Closed
//!                      │                             ▲
//!                      └──────── connect failure ────┘
//! ```
//!
//! Both directions are relayed while connecting, since the client performs
//! its own registration through us. All denoise state lives here and is
//! dropped with the session.

use std::net::SocketAddr;
use std::time::Instant;

use denoise_proto::{LineTransport, Message, Roster, Transport};
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::config::Config;
use crate::denoise::PresenceTracker;
use crate::error::SessionError;
use crate::handlers::{Context, Outcome, Registry};
use crate::telemetry::DumpFlag;

/// Longest line accepted from the client, terminator included.
pub const MAX_CLIENT_LINE: usize = 8 * 1024;

/// Session lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Connecting,
    Active,
    Closed,
}

/// Whether the loop keeps going after a server message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum Flow {
    Continue,
    End,
}

/// A client session.
pub struct Session<'a> {
    pub(super) peer: SocketAddr,
    pub(super) client: LineTransport<TcpStream>,
    pub(super) roster: Roster,
    pub(super) tracker: PresenceTracker,
    pub(super) registry: &'a Registry,
    pub(super) config: &'a Config,
    pub(super) dump: DumpFlag,
    pub(super) phase: SessionPhase,
}

impl<'a> Session<'a> {
    pub fn new(
        stream: TcpStream,
        peer: SocketAddr,
        registry: &'a Registry,
        config: &'a Config,
        dump: DumpFlag,
    ) -> Self {
        Self {
            peer,
            client: LineTransport::new(stream, MAX_CLIENT_LINE),
            roster: Roster::new(),
            tracker: PresenceTracker::new(),
            registry,
            config,
            dump,
            phase: SessionPhase::Idle,
        }
    }

    pub(super) fn set_phase(&mut self, phase: SessionPhase) {
        debug!(from = ?self.phase, to = ?phase, "Session phase");
        self.phase = phase;
    }

    /// Serve the client until either side goes away.
    ///
    /// On a connection problem the client gets one `ERROR` line before the
    /// socket is closed.
    pub async fn run(mut self) -> Result<(), SessionError> {
        info!(peer = %self.peer, server = %self.config.server, "Session started");

        let result = self.serve().await;
        if let Err(err) = &result
            && let Some(notice) = err.client_notice()
            && let Err(write_err) = self.client.write_message(&notice).await
        {
            debug!(error = %write_err, "Could not deliver closing notice");
        }

        self.set_phase(SessionPhase::Closed);
        info!(
            channels = self.tracker.channel_count(),
            records = self.tracker.record_count(),
            "Session closed, releasing state"
        );
        result
    }

    async fn serve(&mut self) -> Result<(), SessionError> {
        self.set_phase(SessionPhase::Connecting);
        let config = self.config;
        // The hard ceiling covers both the connect and the wait for 001.
        let deadline = tokio::time::Instant::now() + config.timeouts.hard;
        let upstream =
            denoise_proto::connect(&config.server.host, config.server.port, config.timeouts).await?;
        self.event_loop(upstream, deadline).await
    }

    /// Dispatch one server message and write the result to the client.
    pub(super) async fn on_server_message(&mut self, msg: Message) -> Result<Flow, SessionError> {
        let mut ctx = Context::new(
            &mut self.roster,
            &mut self.tracker,
            &self.config.denoise,
            Instant::now(),
        );
        let outcome = self.registry.dispatch(&mut ctx, &msg);
        let outbox = std::mem::take(&mut ctx.outbox);

        if self.phase == SessionPhase::Connecting && self.roster.is_registered() {
            self.set_phase(SessionPhase::Active);
            info!(nick = self.roster.me().unwrap_or("*"), "Registered, session active");
        }

        if outcome == Outcome::Relay {
            self.client
                .write_message(&msg)
                .await
                .map_err(SessionError::ClientIo)?;
        }
        for extra in &outbox {
            self.client
                .write_message(extra)
                .await
                .map_err(SessionError::ClientIo)?;
        }

        if msg.is("ERROR") {
            info!(reason = msg.arg(0).unwrap_or(""), "Server ended the session");
            return Ok(Flow::End);
        }
        Ok(Flow::Continue)
    }

    /// Relay one client line upstream. Empty lines are dropped.
    pub(super) async fn on_client_line(
        &mut self,
        upstream: &mut Transport<TcpStream>,
        line: &[u8],
    ) -> Result<(), SessionError> {
        if line.is_empty() {
            return Ok(());
        }
        upstream
            .write_raw(line)
            .await
            .map_err(SessionError::UpstreamWrite)
    }

    /// Periodic garbage collection of departed, unarmed users.
    pub(super) fn housekeeping(&mut self) {
        let dropped = self
            .tracker
            .sweep(Instant::now(), self.config.denoise.arm_window, &self.roster);
        if dropped > 0 {
            debug!(dropped, remaining = self.tracker.record_count(), "Swept activity records");
        }
    }

    /// Log a diagnostic snapshot of session state.
    pub(super) fn dump_state(&self) {
        info!(
            dumped_at = %chrono::Utc::now().to_rfc3339(),
            phase = ?self.phase,
            nick = self.roster.me().unwrap_or("*"),
            casemapping = self.roster.casemapping().as_str(),
            "State dump requested"
        );
        for line in self.tracker.snapshot(Instant::now()).lines() {
            info!("  {line}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use denoise_proto::Timeouts;
    use tokio::net::TcpListener;

    use super::*;
    use crate::config::ServerAddr;
    use crate::denoise::DenoiseSettings;
    use crate::network::HOUSEKEEPING_INTERVAL;

    async fn client_pair() -> (TcpStream, TcpStream, SocketAddr) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).await.unwrap();
        let (accepted, peer) = listener.accept().await.unwrap();
        (client, accepted, peer)
    }

    fn config_for(upstream: SocketAddr) -> Config {
        Config {
            server: ServerAddr {
                host: "127.0.0.1".into(),
                port: upstream.port(),
            },
            listen: "127.0.0.1:0".parse().unwrap(),
            respawn: false,
            timeouts: Timeouts::default(),
            denoise: DenoiseSettings::default(),
        }
    }

    #[tokio::test]
    async fn test_pending_dump_taken_on_first_iteration() {
        let upstream = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = config_for(upstream.local_addr().unwrap());
        let registry = Registry::new();
        let (client, accepted, peer) = client_pair().await;

        let dump = DumpFlag::new();
        dump.request();
        let session = Session::new(accepted, peer, &registry, &config, dump.clone());
        drop(client);

        session.run().await.unwrap();
        assert!(!dump.take());
    }

    #[tokio::test]
    async fn test_dump_requested_while_idle_served_on_housekeeping_wakeup() {
        let upstream = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = config_for(upstream.local_addr().unwrap());
        let registry = Registry::new();
        let (client, accepted, peer) = client_pair().await;

        let dump = DumpFlag::new();
        let session = Session::new(accepted, peer, &registry, &config, dump.clone());
        let driver = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            dump.request();
            tokio::time::sleep(HOUSEKEEPING_INTERVAL + Duration::from_millis(300)).await;
            // `take` reports a request nobody served.
            let unserved = dump.take();
            drop(client);
            unserved
        };

        let (result, unserved) = tokio::join!(session.run(), driver);
        assert!(result.is_ok());
        assert!(!unserved);
    }
}
