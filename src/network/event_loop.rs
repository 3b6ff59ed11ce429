//! The session's multiplexed read loop.

use std::time::Duration;

use bytes::BytesMut;
use denoise_proto::{Message, ProtocolError, Transport};
use tokio::net::TcpStream;
use tokio::time::{Instant, MissedTickBehavior, interval, sleep_until};
use tracing::info;

use super::session::{Flow, Session, SessionPhase};
use crate::error::SessionError;

/// How often the loop wakes up when neither side has data.
pub const HOUSEKEEPING_INTERVAL: Duration = Duration::from_secs(1);

enum SelectResult {
    Client(Result<Option<BytesMut>, ProtocolError>),
    Upstream(Result<Option<Message>, ProtocolError>),
    Housekeeping,
    RegistrationExpired,
}

impl Session<'_> {
    /// Run until the client leaves, the server goes away, or registration
    /// does not finish within the hard timeout.
    pub(super) async fn event_loop(
        &mut self,
        mut upstream: Transport<TcpStream>,
        registration_deadline: Instant,
    ) -> Result<(), SessionError> {
        let hard = self.config.timeouts.hard;
        let registration = sleep_until(registration_deadline);
        tokio::pin!(registration);

        let mut housekeeping = interval(HOUSEKEEPING_INTERVAL);
        housekeeping.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if self.dump.take() {
                self.dump_state();
            }

            let event = if upstream.has_buffered_message() {
                // Already framed; no need to wait on either socket.
                SelectResult::Upstream(upstream.read_message().await)
            } else {
                let connecting = self.phase == SessionPhase::Connecting;
                tokio::select! {
                    line = self.client.read_line() => SelectResult::Client(line),
                    msg = upstream.read_message() => SelectResult::Upstream(msg),
                    _ = housekeeping.tick() => SelectResult::Housekeeping,
                    () = &mut registration, if connecting => SelectResult::RegistrationExpired,
                }
            };

            match event {
                SelectResult::Client(Ok(Some(line))) => {
                    self.on_client_line(&mut upstream, &line).await?;
                }
                SelectResult::Client(Ok(None)) => {
                    info!("Client disconnected");
                    return Ok(());
                }
                SelectResult::Client(Err(e)) => return Err(SessionError::ClientIo(e)),
                SelectResult::Upstream(Ok(Some(msg))) => {
                    if self.on_server_message(msg).await? == Flow::End {
                        return Ok(());
                    }
                }
                SelectResult::Upstream(Ok(None)) => return Err(SessionError::ServerClosed),
                SelectResult::Upstream(Err(e)) => return Err(SessionError::ProtocolRead(e)),
                SelectResult::Housekeeping => self.housekeeping(),
                SelectResult::RegistrationExpired => {
                    return Err(SessionError::RegistrationTimeout(hard));
                }
            }
        }
    }
}
