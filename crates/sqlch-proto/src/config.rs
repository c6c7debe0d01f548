use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

use super::platform;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub watcher: WatcherConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

/// Paths left unset here are resolved from the environment each time the
/// daemon starts, never written back to the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_socket: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_file: Option<PathBuf>,
    /// Per-connection read/write budget on the control socket.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// How the managed mpv process is launched and talked to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Explicit mpv binary; otherwise `MPV_BIN`, then `PATH`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary: Option<PathBuf>,
    /// MPRIS script passed as `--script=`; otherwise `SQLCH_MPRIS_PLUGIN`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mpris_plugin: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipc_socket: Option<PathBuf>,
    #[serde(default = "default_preview_volume")]
    pub preview_volume: u8,
    #[serde(default = "default_ipc_timeout_ms")]
    pub ipc_timeout_ms: u64,
    #[serde(default = "default_ready_timeout_ms")]
    pub ready_timeout_ms: u64,
    #[serde(default = "default_quit_timeout_ms")]
    pub quit_timeout_ms: u64,
    #[serde(default)]
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Consecutive failed polls before the watcher gives up on the channel.
    #[serde(default = "default_max_missed_polls")]
    pub max_missed_polls: u32,
    /// Enrichment attempts per title before the raw title is published.
    #[serde(default = "default_enrich_attempts")]
    pub enrich_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewConfig {
    #[serde(default = "default_preview_secs")]
    pub default_duration_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    #[serde(default = "default_discovery_url")]
    pub base_url: String,
    #[serde(default = "default_discovery_limit")]
    pub limit: usize,
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_musicbrainz_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            control_socket: None,
            library_file: None,
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            binary: None,
            mpris_plugin: None,
            ipc_socket: None,
            preview_volume: default_preview_volume(),
            ipc_timeout_ms: default_ipc_timeout_ms(),
            ready_timeout_ms: default_ready_timeout_ms(),
            quit_timeout_ms: default_quit_timeout_ms(),
            extra_args: Vec::new(),
        }
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_missed_polls: default_max_missed_polls(),
            enrich_attempts: default_enrich_attempts(),
        }
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            default_duration_secs: default_preview_secs(),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            base_url: default_discovery_url(),
            limit: default_discovery_limit(),
            timeout_secs: default_http_timeout_secs(),
        }
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_musicbrainz_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_http_timeout_secs(),
        }
    }
}

impl DaemonConfig {
    pub fn control_socket_path(&self) -> PathBuf {
        self.control_socket
            .clone()
            .unwrap_or_else(platform::control_socket_path)
    }

    pub fn library_path(&self) -> PathBuf {
        self.library_file.clone().unwrap_or_else(platform::library_path)
    }
}

impl PlayerConfig {
    pub fn ipc_socket_path(&self) -> PathBuf {
        self.ipc_socket.clone().unwrap_or_else(platform::mpv_socket_path)
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_request_timeout_ms() -> u64 {
    2000
}

fn default_preview_volume() -> u8 {
    60
}

fn default_ipc_timeout_ms() -> u64 {
    400
}

fn default_ready_timeout_ms() -> u64 {
    2000
}

fn default_quit_timeout_ms() -> u64 {
    300
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_max_missed_polls() -> u32 {
    20
}

fn default_enrich_attempts() -> u32 {
    3
}

fn default_preview_secs() -> u64 {
    crate::protocol::DEFAULT_PREVIEW_SECS
}

fn default_discovery_url() -> String {
    "https://de1.api.radio-browser.info/json".to_string()
}

fn default_discovery_limit() -> usize {
    25
}

fn default_musicbrainz_url() -> String {
    "https://musicbrainz.org/ws/2".to_string()
}

fn default_user_agent() -> String {
    format!("sqlch/{}", env!("CARGO_PKG_VERSION"))
}

fn default_http_timeout_secs() -> u64 {
    8
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load the config file, writing defaults when it does not exist.  A
    /// file that cannot be parsed is treated as absent.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        Ok(Self::parse(&content).unwrap_or_else(|e| {
            warn!("config: {} is invalid, using defaults: {}", config_path.display(), e);
            Self::default()
        }))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}
