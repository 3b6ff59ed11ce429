//! Test relay management.
//!
//! Spawns ircdenoise instances for integration testing.

use std::process::{Child, Command, ExitStatus};
use std::time::Duration;
use tokio::time::sleep;

/// A running relay process.
pub struct TestRelay {
    child: Child,
    port: u16,
}

impl TestRelay {
    /// Spawn a relay listening on `127.0.0.1:port` in front of `upstream`.
    ///
    /// Readiness is not probed here: the relay serves the first client that
    /// connects, so use [`super::TestClient::connect`] which retries.
    pub fn spawn(port: u16, upstream: &str, extra_args: &[&str]) -> anyhow::Result<Self> {
        let child = Command::new(env!("CARGO_BIN_EXE_ircdenoise"))
            .args(["-l", "127.0.0.1", "-p", &port.to_string()])
            .args(extra_args)
            .arg(upstream)
            .env_remove("IRCDENOISE_CONFIG")
            .spawn()?;

        Ok(Self { child, port })
    }

    /// Get the relay address.
    pub fn address(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }

    /// Wait for the process to exit on its own.
    pub async fn wait_exit(&mut self, within: Duration) -> anyhow::Result<ExitStatus> {
        let step = Duration::from_millis(50);
        let mut waited = Duration::ZERO;
        while waited < within {
            if let Some(status) = self.child.try_wait()? {
                return Ok(status);
            }
            sleep(step).await;
            waited += step;
        }
        anyhow::bail!("relay still running after {:?}", within)
    }
}

impl Drop for TestRelay {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
