//! Test IRC client.
//!
//! Sends raw lines to the relay and asserts on the raw lines it gets back.

use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::{sleep, timeout};

/// A test client connected to the relay.
pub struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
}

impl TestClient {
    /// Connect, retrying while the relay starts up.
    pub async fn connect(address: &str) -> anyhow::Result<Self> {
        for _ in 0..50 {
            if let Ok(stream) = TcpStream::connect(address).await {
                let (read_half, write_half) = stream.into_split();
                return Ok(Self {
                    reader: BufReader::new(read_half),
                    writer: BufWriter::new(write_half),
                });
            }
            sleep(Duration::from_millis(100)).await;
        }
        anyhow::bail!("Relay at {} did not accept within 5 seconds", address)
    }

    /// Send a raw line. CRLF is appended unless already present.
    pub async fn send_raw(&mut self, line: &str) -> anyhow::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        if !line.ends_with('\n') {
            self.writer.write_all(b"\r\n").await?;
        }
        self.writer.flush().await?;
        Ok(())
    }

    /// Send raw bytes as-is, terminator included.
    pub async fn send_bytes(&mut self, data: &[u8]) -> anyhow::Result<()> {
        self.writer.write_all(data).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Register through the relay (NICK + USER).
    pub async fn register(&mut self, nick: &str) -> anyhow::Result<()> {
        self.send_raw(&format!("NICK {nick}")).await?;
        self.send_raw(&format!("USER {nick} 0 * :Test User {nick}")).await
    }

    /// Receive one line, terminator stripped.
    pub async fn recv(&mut self) -> anyhow::Result<String> {
        self.recv_timeout(Duration::from_secs(5)).await
    }

    pub async fn recv_timeout(&mut self, dur: Duration) -> anyhow::Result<String> {
        let mut line = String::new();
        let n = timeout(dur, self.reader.read_line(&mut line)).await??;
        if n == 0 {
            anyhow::bail!("connection closed");
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Wait for the relay to close the connection.
    pub async fn expect_closed(&mut self) -> anyhow::Result<()> {
        let mut line = String::new();
        let n = timeout(Duration::from_secs(5), self.reader.read_line(&mut line)).await??;
        if n != 0 {
            anyhow::bail!("expected close, got {:?}", line);
        }
        Ok(())
    }
}
