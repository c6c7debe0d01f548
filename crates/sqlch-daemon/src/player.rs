//! Managed-process backend: spawning mpv, waiting for its IPC socket, and
//! taking it down again.
use crate::mpv::{MpvChannel, PropertyChannel};
use async_trait::async_trait;
use sqlch_proto::config::PlayerConfig;
use sqlch_proto::error::SqlchError;
use sqlch_proto::platform;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

const READY_POLL: Duration = Duration::from_millis(50);
const PKILL_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    Station,
    /// Quieter, time-boxed playback.
    Preview,
}

/// Handle to a spawned player process.
#[derive(Debug, Default)]
pub struct ManagedProcess {
    child: Option<Child>,
}

impl ManagedProcess {
    pub fn spawned(child: Child) -> Self {
        Self { child: Some(child) }
    }

    /// A process the backend does not hand out a child handle for.
    pub fn detached() -> Self {
        Self { child: None }
    }

    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().and_then(|c| c.id())
    }

    /// Wait up to `grace` for the process to exit on its own, then kill it.
    /// Safe to call on an already-exited or detached process.
    pub async fn terminate(&mut self, grace: Duration) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        if let Ok(Some(status)) = child.try_wait() {
            debug!("player: process already exited ({})", status);
            return;
        }
        match tokio::time::timeout(grace, child.wait()).await {
            Ok(Ok(status)) => debug!("player: process exited ({})", status),
            _ => {
                warn!("player: process ignored quit, killing");
                if let Err(e) = child.kill().await {
                    debug!("player: kill failed: {}", e);
                }
            }
        }
    }
}

#[async_trait]
pub trait PlayerBackend: Send + Sync {
    /// Start a player process for `url`.
    async fn launch(&self, url: &str, mode: LaunchMode) -> anyhow::Result<ManagedProcess>;

    /// Bounded poll until the control channel answers.
    async fn wait_ready(&self) -> bool;

    async fn is_reachable(&self) -> bool;

    async fn toggle_pause(&self) -> Result<(), SqlchError>;

    /// Best-effort graceful quit over the control channel.
    async fn request_quit(&self);

    /// Delete the control-channel socket, reap or kill `process`, and kill
    /// any straggler still bound to the channel path.
    async fn release(&self, process: Option<ManagedProcess>);

    fn channel(&self) -> Arc<dyn PropertyChannel>;
}

// ── mpv ───────────────────────────────────────────────────────────────────────

pub struct MpvBackend {
    config: PlayerConfig,
    ipc_socket: PathBuf,
    channel: Arc<MpvChannel>,
}

impl MpvBackend {
    pub fn new(config: PlayerConfig) -> Self {
        let ipc_socket = config.ipc_socket_path();
        let channel = Arc::new(MpvChannel::new(
            ipc_socket.clone(),
            Duration::from_millis(config.ipc_timeout_ms),
        ));
        Self {
            config,
            ipc_socket,
            channel,
        }
    }

    fn binary(&self) -> anyhow::Result<PathBuf> {
        self.config
            .binary
            .clone()
            .or_else(platform::find_mpv_binary)
            .ok_or_else(|| anyhow::anyhow!("mpv binary not found (set MPV_BIN or player.binary)"))
    }

    fn args(&self, url: &str, mode: LaunchMode) -> Vec<String> {
        let mut args = vec![
            platform::mpv_socket_arg(&self.ipc_socket),
            "--idle=yes".to_string(),
            "--force-window=no".to_string(),
            "--no-terminal".to_string(),
            "--cache=yes".to_string(),
            "--no-video".to_string(),
        ];
        if let Some(script) = self
            .config
            .mpris_plugin
            .clone()
            .or_else(platform::mpris_plugin)
        {
            args.push(format!("--script={}", script.display()));
        }
        if mode == LaunchMode::Preview {
            args.push(format!("--volume={}", self.config.preview_volume.min(100)));
        }
        args.extend(self.config.extra_args.iter().cloned());
        args.push(url.to_string());
        args
    }

    fn quit_timeout(&self) -> Duration {
        Duration::from_millis(self.config.quit_timeout_ms)
    }

    async fn remove_socket(&self) {
        match tokio::fs::remove_file(&self.ipc_socket).await {
            Ok(()) => debug!("player: removed {}", self.ipc_socket.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("player: could not remove {}: {}", self.ipc_socket.display(), e),
        }
    }

    /// `pkill -f` anything whose command line names our IPC socket.  Covers
    /// processes from an earlier daemon run that we hold no handle for.
    async fn kill_stragglers(&self) {
        let pattern = format!(
            "mpv.*{}",
            self.ipc_socket.display().to_string().replace('.', "\\.")
        );
        let status = Command::new("pkill")
            .arg("-f")
            .arg(&pattern)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match tokio::time::timeout(PKILL_TIMEOUT, status).await {
            Ok(Ok(s)) if s.success() => info!("player: killed straggler matching '{}'", pattern),
            Ok(Ok(_)) => {}
            Ok(Err(e)) => debug!("player: pkill unavailable: {}", e),
            Err(_) => debug!("player: pkill timed out"),
        }
    }
}

#[async_trait]
impl PlayerBackend for MpvBackend {
    async fn launch(&self, url: &str, mode: LaunchMode) -> anyhow::Result<ManagedProcess> {
        if let Some(parent) = self.ipc_socket.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        self.remove_socket().await;

        let binary = self.binary()?;
        info!("player: spawning {} for {} ({:?})", binary.display(), url, mode);
        let child = Command::new(binary)
            .args(self.args(url, mode))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        let process = ManagedProcess::spawned(child);
        debug!("player: mpv pid {:?}", process.id());
        Ok(process)
    }

    async fn wait_ready(&self) -> bool {
        let deadline =
            tokio::time::Instant::now() + Duration::from_millis(self.config.ready_timeout_ms);
        while tokio::time::Instant::now() < deadline {
            if self.channel.is_reachable().await {
                return true;
            }
            tokio::time::sleep(READY_POLL).await;
        }
        warn!("player: IPC socket not reachable after {} ms", self.config.ready_timeout_ms);
        false
    }

    async fn is_reachable(&self) -> bool {
        self.channel.is_reachable().await
    }

    async fn toggle_pause(&self) -> Result<(), SqlchError> {
        self.channel.cycle_pause().await
    }

    async fn request_quit(&self) {
        if !self.ipc_socket.exists() {
            return;
        }
        if let Err(e) = self.channel.quit(self.quit_timeout()).await {
            debug!("player: graceful quit failed: {}", e);
        }
    }

    async fn release(&self, process: Option<ManagedProcess>) {
        self.remove_socket().await;
        if let Some(mut process) = process {
            process.terminate(self.quit_timeout()).await;
        }
        self.kill_stragglers().await;
    }

    fn channel(&self) -> Arc<dyn PropertyChannel> {
        self.channel.clone()
    }
}
