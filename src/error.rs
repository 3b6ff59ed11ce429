//! Session-scoped errors.
//!
//! None of these are fatal to the process. [`SessionError::client_notice`]
//! builds the one line the client sees when its session ends; operator
//! detail stays in the log.

use std::io;
use std::time::Duration;

use denoise_proto::{ConnectError, Message, ProtocolError};
use thiserror::Error;

/// Why a session ended abnormally.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("upstream connect failed: {0}")]
    Connect(#[from] ConnectError),

    #[error("server closed the connection")]
    ServerClosed,

    #[error("upstream read failed: {0}")]
    ProtocolRead(#[source] ProtocolError),

    #[error("upstream write failed: {0}")]
    UpstreamWrite(#[source] ProtocolError),

    #[error("client i/o failed: {0}")]
    ClientIo(#[source] ProtocolError),

    #[error("registration not completed within {0:?}")]
    RegistrationTimeout(Duration),
}

impl SessionError {
    /// Get a static error code string for log labeling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Connect(_) => "connect",
            Self::ServerClosed => "server_closed",
            Self::ProtocolRead(_) => "protocol_read",
            Self::UpstreamWrite(_) => "upstream_write",
            Self::ClientIo(_) => "client_io",
            Self::RegistrationTimeout(_) => "registration_timeout",
        }
    }

    /// The `ERROR` line for the client, if it should get one.
    ///
    /// Client I/O failures get nothing: the client is the failing party.
    pub fn client_notice(&self) -> Option<Message> {
        let reason = match self {
            Self::Connect(ConnectError::Resolve { .. }) => "cannot resolve server",
            Self::Connect(ConnectError::NoAddresses(_)) => "cannot resolve server",
            Self::Connect(ConnectError::TimedOut(_)) => "connection timed out",
            Self::Connect(ConnectError::Failed { source, .. })
                if source.kind() == io::ErrorKind::ConnectionRefused =>
            {
                "connection refused"
            }
            Self::Connect(ConnectError::Failed { .. }) => "cannot connect to server",
            Self::ServerClosed => "server closed the connection",
            Self::ProtocolRead(_) | Self::UpstreamWrite(_) => "server connection lost",
            Self::RegistrationTimeout(_) => "registration timed out",
            Self::ClientIo(_) => return None,
        };
        Some(Message::error(format!("Closing Link: {reason}")))
    }
}
