//! Scripted fake IRC server.
//!
//! Accepts the relay's outbound connection and lets a test read what the
//! relay sent and write whatever the server should say.

use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

/// Listener standing in for the upstream server.
pub struct FakeUpstream {
    listener: TcpListener,
}

impl FakeUpstream {
    pub async fn bind() -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        Ok(Self { listener })
    }

    pub fn addr(&self) -> SocketAddr {
        self.listener.local_addr().expect("bound listener has an address")
    }

    /// Hostspec to hand the relay.
    pub fn hostspec(&self) -> String {
        format!("127.0.0.1:{}", self.addr().port())
    }

    /// Accept the relay's connection.
    pub async fn accept(&self) -> anyhow::Result<UpstreamConn> {
        let (stream, _) = timeout(Duration::from_secs(5), self.listener.accept()).await??;
        Ok(UpstreamConn::new(stream))
    }
}

/// One accepted relay connection.
pub struct UpstreamConn {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl UpstreamConn {
    fn new(stream: TcpStream) -> Self {
        let (read_half, write_half) = stream.into_split();
        Self {
            reader: BufReader::new(read_half),
            writer: write_half,
        }
    }

    /// Send one line as the server.
    pub async fn send_raw(&mut self, line: &str) -> anyhow::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\r\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Receive one line from the relay, exactly as sent minus CRLF.
    pub async fn recv(&mut self) -> anyhow::Result<String> {
        let mut line = String::new();
        let n = timeout(Duration::from_secs(5), self.reader.read_line(&mut line)).await??;
        if n == 0 {
            anyhow::bail!("relay closed the upstream connection");
        }
        let stripped = line.strip_suffix("\r\n").ok_or_else(|| {
            anyhow::anyhow!("line not CRLF-terminated: {:?}", line)
        })?;
        Ok(stripped.to_string())
    }

    /// Receive one line as bytes, CRLF included.
    pub async fn recv_bytes(&mut self) -> anyhow::Result<Vec<u8>> {
        let mut line = Vec::new();
        let n = timeout(Duration::from_secs(5), self.reader.read_until(b'\n', &mut line)).await??;
        if n == 0 {
            anyhow::bail!("relay closed the upstream connection");
        }
        Ok(line)
    }

    /// Read NICK and USER, then welcome `nick`.
    pub async fn accept_registration(&mut self, nick: &str) -> anyhow::Result<()> {
        let first = self.recv().await?;
        anyhow::ensure!(first == format!("NICK {nick}"), "unexpected {first:?}");
        let second = self.recv().await?;
        anyhow::ensure!(second.starts_with("USER "), "unexpected {second:?}");
        self.send_raw(&format!(":irc.test 001 {nick} :Welcome to the test network"))
            .await
    }
}
