//! Control Socket Server.
//!
//! One request per connection, handled to completion before the next
//! connection is accepted:
//!
//! ```text
//!   accept → read until '\n' or EOF (bounded by time and size)
//!          → dispatch → write one reply line → close
//! ```
use crate::core::DaemonCore;
use sqlch_proto::protocol::Reply;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub const MAX_REQUEST_BYTES: usize = 64 * 1024;

enum Incoming {
    Line(String),
    Empty,
    TooLarge,
}

pub struct ControlServer {
    listener: UnixListener,
    path: PathBuf,
    core: Arc<DaemonCore>,
    io_timeout: Duration,
}

impl ControlServer {
    /// Bind `path`, replacing a stale socket file, and restrict it to the
    /// owner.
    pub fn bind(path: &Path, core: Arc<DaemonCore>, io_timeout: Duration) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        match std::fs::remove_file(path) {
            Ok(()) => debug!("socket: removed stale {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        let listener = UnixListener::bind(path)?;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        info!("socket: listening at {}", path.display());
        Ok(Self {
            listener,
            path: path.to_path_buf(),
            core,
            io_timeout,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Accept loop.  Returns after `shutdown` is cancelled, removing the
    /// socket file.
    pub async fn serve(self, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, _)) => self.handle_connection(stream).await,
                    Err(e) => error!("socket: accept failed: {}", e),
                }
            }
        }
        if let Err(e) = std::fs::remove_file(&self.path) {
            debug!("socket: could not remove {}: {}", self.path.display(), e);
        }
        info!("socket: closed");
    }

    async fn handle_connection(&self, stream: UnixStream) {
        let (mut read_half, mut write_half) = stream.into_split();

        let reply = match tokio::time::timeout(self.io_timeout, read_request(&mut read_half)).await {
            Err(_) => Reply::error("request timed out"),
            Ok(Err(e)) => {
                warn!("socket: read failed: {}", e);
                return;
            }
            Ok(Ok(Incoming::Empty)) => Reply::error("empty request"),
            Ok(Ok(Incoming::TooLarge)) => Reply::error("request too large"),
            Ok(Ok(Incoming::Line(line))) => self.core.handle_line(&line).await,
        };

        let bytes = match reply.encode() {
            Ok(b) => b,
            Err(e) => {
                error!("socket: could not encode reply: {}", e);
                return;
            }
        };
        match tokio::time::timeout(self.io_timeout, write_half.write_all(&bytes)).await {
            Ok(Ok(())) => {
                let _ = write_half.shutdown().await;
            }
            Ok(Err(e)) => debug!("socket: client went away before reply: {}", e),
            Err(_) => warn!("socket: reply write timed out"),
        }
    }
}

/// Read up to the first newline or EOF.
async fn read_request<R: AsyncRead + Unpin>(reader: &mut R) -> std::io::Result<Incoming> {
    let mut buf: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.iter().position(|b| *b == b'\n') {
            buf.truncate(pos);
            break;
        }
        if buf.len() > MAX_REQUEST_BYTES {
            return Ok(Incoming::TooLarge);
        }
    }
    if buf.len() > MAX_REQUEST_BYTES {
        return Ok(Incoming::TooLarge);
    }
    let line = String::from_utf8_lossy(&buf).trim().to_string();
    if line.is_empty() {
        Ok(Incoming::Empty)
    } else {
        Ok(Incoming::Line(line))
    }
}
