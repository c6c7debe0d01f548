use std::process::Stdio;
use tracing::debug;

/// User-facing notifications.  Fire-and-forget: implementations must not
/// block or fail.
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, body: &str);
}

/// `notify-send` desktop notifications.
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, body: &str) {
        let spawned = tokio::process::Command::new("notify-send")
            .arg(title)
            .arg(body)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        match spawned {
            // Reap in the background so no zombie is left behind.
            Ok(mut child) => {
                tokio::spawn(async move {
                    let _ = child.wait().await;
                });
            }
            Err(e) => debug!("notify: notify-send unavailable: {}", e),
        }
    }
}

/// Logs instead of notifying; used when notifications are disabled.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, body: &str) {
        debug!("notify: {}: {}", title, body);
    }
}
