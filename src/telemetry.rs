//! Logging setup, the diagnostic dump trigger and standard spans.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing_subscriber::EnvFilter;

/// Base filter for a verbosity offset (`-v` minus `-q`).
pub fn level_for(verbosity: i8) -> &'static str {
    match verbosity {
        i8::MIN..=-3 => "off",
        -2 => "error",
        -1 => "warn",
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Initialize tracing. `RUST_LOG` overrides the verbosity flags.
pub fn init(verbosity: i8) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_for(verbosity))),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Pending request for a state dump. Set asynchronously, taken by the
/// session loop once per iteration.
#[derive(Clone, Debug, Default)]
pub struct DumpFlag(Arc<AtomicBool>);

impl DumpFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a dump.
    pub fn request(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Clear and return the pending request.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::Relaxed)
    }
}

/// Set `flag` on every SIGUSR1.
///
/// The listener task does nothing else.
#[cfg(unix)]
pub fn spawn_dump_listener(flag: DumpFlag) -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut usr1 = signal(SignalKind::user_defined1())?;
    tokio::spawn(async move {
        while usr1.recv().await.is_some() {
            flag.request();
        }
    });
    Ok(())
}

#[cfg(not(unix))]
pub fn spawn_dump_listener(_flag: DumpFlag) -> std::io::Result<()> {
    Ok(())
}

/// Standardized span constructors.
pub mod spans {
    use std::net::SocketAddr;

    use tracing::{Span, debug_span, info_span};

    /// Span for one client session.
    pub fn session(peer: SocketAddr) -> Span {
        info_span!("session", peer = %peer)
    }

    /// Span for dispatching one server message.
    pub fn dispatch(command: &str) -> Span {
        debug_span!("dispatch", command = %command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels() {
        assert_eq!(level_for(0), "info");
        assert_eq!(level_for(2), "trace");
        assert_eq!(level_for(-1), "warn");
        assert_eq!(level_for(-5), "off");
    }

    #[test]
    fn test_dump_flag_take_clears() {
        let flag = DumpFlag::new();
        assert!(!flag.take());
        flag.clone().request();
        assert!(flag.take());
        assert!(!flag.take());
    }
}
