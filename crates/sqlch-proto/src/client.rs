//! Control-socket client used by the CLI and TUI.  Callers check
//! `daemon_available()` and fall back to in-process calls when it is false.
use crate::protocol::{Reply, Request};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone)]
pub struct DaemonClient {
    socket_path: PathBuf,
    timeout: Duration,
}

impl DaemonClient {
    pub fn new(socket_path: PathBuf) -> Self {
        Self {
            socket_path,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// A socket file exists at the control path.  It may still be stale; a
    /// failed `send` is the authoritative answer.
    pub fn daemon_available(&self) -> bool {
        self.socket_path.exists()
    }

    /// Send one request and wait for the single reply line.
    pub async fn send(&self, request: &Request) -> anyhow::Result<Reply> {
        let payload = request.encode()?;
        tokio::time::timeout(self.timeout, self.exchange(&payload))
            .await
            .map_err(|_| anyhow::anyhow!("daemon did not answer within {:?}", self.timeout))?
    }

    async fn exchange(&self, payload: &[u8]) -> anyhow::Result<Reply> {
        let stream = UnixStream::connect(&self.socket_path).await?;
        let (read_half, mut write_half) = stream.into_split();
        write_half.write_all(payload).await?;

        let mut reader = BufReader::new(read_half);
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(Reply::error("no response"));
        }
        Reply::decode(&line)
    }
}
