//! Default values for configuration.

/// Listen port when none is configured.
pub const LISTEN_PORT: u16 = 7777;

/// Upstream port when the hostspec has none.
pub const SERVER_PORT: u16 = 6667;

/// Hard ceiling for connecting and registering, in seconds.
pub const HARD_TIMEOUT_SECS: u64 = 30;

/// How long a message keeps its author armed, in seconds.
pub const ARM_WINDOW_SECS: u64 = 600;

pub const ANNOUNCE_AS: &str = "denoise";
