use std::path::{Path, PathBuf};

pub const APP_NAME: &str = "sqlch";

const CONTROL_SOCKET_FILE: &str = "control.sock";
const MPV_SOCKET_FILE: &str = "mpv.sock";

/// Resolve `$VAR/sqlch`, falling back to `~/<home_rel>/sqlch`.
fn xdg_dir(var: &str, home_rel: &[&str]) -> PathBuf {
    if let Some(base) = std::env::var_os(var).filter(|v| !v.is_empty()) {
        return PathBuf::from(base).join(APP_NAME);
    }
    let mut dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/tmp"));
    for part in home_rel {
        dir.push(part);
    }
    dir.join(APP_NAME)
}

/// Create `dir` if needed and hand it back.  Creation failures are left for
/// the first real read/write on the path to report.
fn ensured(dir: PathBuf) -> PathBuf {
    if let Err(e) = std::fs::create_dir_all(&dir) {
        tracing::debug!("could not create {}: {}", dir.display(), e);
    }
    dir
}

/// Per-user runtime directory.  Prefers `XDG_RUNTIME_DIR` (systemd user
/// session), falls back to `/tmp` for plain shells.
pub fn runtime_dir() -> PathBuf {
    let base = std::env::var_os("XDG_RUNTIME_DIR")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/tmp"));
    ensured(base.join(APP_NAME))
}

pub fn data_dir() -> PathBuf {
    ensured(xdg_dir("XDG_DATA_HOME", &[".local", "share"]))
}

pub fn cache_dir() -> PathBuf {
    ensured(xdg_dir("XDG_CACHE_HOME", &[".cache"]))
}

pub fn config_dir() -> PathBuf {
    ensured(xdg_dir("XDG_CONFIG_HOME", &[".config"]))
}

/// Daemon control socket clients connect to.
pub fn control_socket_path() -> PathBuf {
    runtime_dir().join(CONTROL_SOCKET_FILE)
}

/// IPC socket handed to the managed mpv process.
pub fn mpv_socket_path() -> PathBuf {
    runtime_dir().join(MPV_SOCKET_FILE)
}

pub fn library_path() -> PathBuf {
    data_dir().join("library.json")
}

/// `--input-ipc-server=<path>` argument for mpv.
pub fn mpv_socket_arg(path: &Path) -> String {
    format!("--input-ipc-server={}", path.display())
}

/// Find the mpv binary.  `MPV_BIN` (exported by packaging wrappers) wins,
/// then `PATH`.
pub fn find_mpv_binary() -> Option<PathBuf> {
    if let Some(p) = std::env::var_os("MPV_BIN").filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(p));
    }
    find_on_path(&["mpv"])
}

/// MPRIS script for mpv, if the packaging wrapper exported one.
pub fn mpris_plugin() -> Option<PathBuf> {
    std::env::var_os("SQLCH_MPRIS_PLUGIN")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn find_on_path(names: &[&str]) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path) {
        for name in names {
            let p = dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }
    None
}
