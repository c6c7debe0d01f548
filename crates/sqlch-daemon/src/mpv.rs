/// mpv JSON IPC client.
///
/// Every call opens a short-lived connection to the IPC socket, writes one
/// request line and reads lines until the reply carrying the same
/// `request_id` arrives:
///
/// ```text
///   → {"command":["get_property","metadata"],"request_id":7}\n
///   ← {"event":"property-change",...}\n        (skipped)
///   ← {"data":{...},"error":"success","request_id":7}\n
/// ```
///
/// Calls never outlive their timeout, so a wedged mpv cannot stall the
/// daemon.  A missing socket, a refused connection, EOF or a timeout all
/// surface as `ChannelUnreachable`; an mpv-side failure as `PlayerCommand`.
use async_trait::async_trait;
use serde_json::{json, Value};
use sqlch_proto::error::SqlchError;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tracing::debug;

// ── global request-id counter ─────────────────────────────────────────────────

static NEXT_REQ_ID: AtomicU64 = AtomicU64::new(1);

/// The subset of the control channel the metadata watcher needs.
#[async_trait]
pub trait PropertyChannel: Send + Sync {
    async fn get_property(&self, name: &str) -> Result<Value, SqlchError>;
    async fn set_property_string(&self, name: &str, value: &str) -> Result<(), SqlchError>;
}

#[derive(Debug, Clone)]
pub struct MpvChannel {
    socket_path: PathBuf,
    timeout: Duration,
}

impl MpvChannel {
    pub fn new(socket_path: PathBuf, timeout: Duration) -> Self {
        Self {
            socket_path,
            timeout,
        }
    }

    pub async fn send(&self, command: Value) -> Result<Value, SqlchError> {
        self.send_with_timeout(command, self.timeout).await
    }

    /// Send `command` and return the reply's `data` field.
    pub async fn send_with_timeout(
        &self,
        command: Value,
        timeout: Duration,
    ) -> Result<Value, SqlchError> {
        if !self.socket_path.exists() {
            return Err(SqlchError::ChannelUnreachable(format!(
                "{} does not exist",
                self.socket_path.display()
            )));
        }

        let req_id = NEXT_REQ_ID.fetch_add(1, Ordering::Relaxed);
        let msg = json!({ "command": command, "request_id": req_id });
        let mut raw = serde_json::to_string(&msg)?;
        raw.push('\n');

        tokio::time::timeout(timeout, self.exchange(req_id, raw))
            .await
            .map_err(|_| {
                SqlchError::ChannelUnreachable(format!("mpv IPC timeout for req={}", req_id))
            })?
    }

    async fn exchange(&self, req_id: u64, payload: String) -> Result<Value, SqlchError> {
        let unreachable = |e: std::io::Error| SqlchError::ChannelUnreachable(e.to_string());

        let stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(unreachable)?;
        let (read_half, mut write_half) = stream.into_split();
        debug!("mpv: send req={} payload={}", req_id, payload.trim());
        write_half
            .write_all(payload.as_bytes())
            .await
            .map_err(unreachable)?;

        let mut reader = BufReader::new(read_half);
        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line).await.map_err(unreachable)? == 0 {
                return Err(SqlchError::ChannelUnreachable(
                    "mpv IPC connection closed".into(),
                ));
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let val: Value = match serde_json::from_str(trimmed) {
                Ok(v) => v,
                Err(e) => {
                    debug!("mpv: invalid json '{}': {}", trimmed, e);
                    continue;
                }
            };
            // Unsolicited events and replies to other clients.
            if val.get("request_id").and_then(|v| v.as_u64()) != Some(req_id) {
                continue;
            }
            return match val.get("error").and_then(|e| e.as_str()) {
                Some("success") => Ok(val.get("data").cloned().unwrap_or(Value::Null)),
                other => {
                    let err = other.unwrap_or("unknown error").to_string();
                    debug!("mpv: response req={} err={}", req_id, err);
                    Err(SqlchError::PlayerCommand(err))
                }
            };
        }
    }
}

// ── convenience wrappers ──────────────────────────────────────────────────────

impl MpvChannel {
    /// True when mpv answers on the socket.
    pub async fn is_reachable(&self) -> bool {
        self.send(json!(["get_property", "pid"])).await.is_ok()
    }

    pub async fn cycle_pause(&self) -> Result<(), SqlchError> {
        self.send(json!(["cycle", "pause"])).await.map(|_| ())
    }

    pub async fn quit(&self, timeout: Duration) -> Result<(), SqlchError> {
        self.send_with_timeout(json!(["quit"]), timeout)
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl PropertyChannel for MpvChannel {
    async fn get_property(&self, name: &str) -> Result<Value, SqlchError> {
        self.send(json!(["get_property", name])).await
    }

    async fn set_property_string(&self, name: &str, value: &str) -> Result<(), SqlchError> {
        self.send(json!(["set_property_string", name, value]))
            .await
            .map(|_| ())
    }
}
