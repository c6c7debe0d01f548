mod core;
mod discover;
mod enrich;
mod mpv;
mod notify;
mod player;
mod socket;
mod supervisor;
#[cfg(test)]
mod testutil;
mod timer;
mod watcher;

use sqlch_proto::config::Config;
use sqlch_proto::library::LibraryStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn init_logging() -> anyhow::Result<()> {
    let data_dir = sqlch_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = data_dir.join("daemon.log");

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,sqlch_daemon=debug")),
        )
        .init();

    info!("Log file: {:?}", log_path);
    Ok(())
}

fn build_enricher(config: &Config) -> Arc<dyn enrich::Enricher> {
    if !config.enrichment.enabled {
        return Arc::new(enrich::Passthrough);
    }
    match enrich::MusicBrainz::new(&config.enrichment) {
        Ok(mb) => Arc::new(mb),
        Err(e) => {
            warn!("MusicBrainz client unavailable, enrichment off: {}", e);
            Arc::new(enrich::Passthrough)
        }
    }
}

fn build_notifier(config: &Config) -> Arc<dyn notify::Notifier> {
    if config.notifications.enabled {
        Arc::new(notify::DesktopNotifier)
    } else {
        Arc::new(notify::LogNotifier)
    }
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() -> anyhow::Result<()> {
    let mut term = signal(SignalKind::terminate())?;
    tokio::select! {
        r = tokio::signal::ctrl_c() => r?,
        _ = term.recv() => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;

    let config = Config::load()?;
    info!("Config loaded from: {:?}", Config::config_path());

    let library = Arc::new(LibraryStore::new(config.daemon.library_path()));
    info!("Library: {:?}", library.path());

    let backend = Arc::new(player::MpvBackend::new(config.player.clone()));
    let supervisor = supervisor::Supervisor::new(
        backend,
        library.clone(),
        build_enricher(&config),
        build_notifier(&config),
        watcher::WatcherSettings::from(&config.watcher),
    );
    if supervisor.reconcile().await {
        info!("Cleaned up a player left over from a previous daemon");
    }

    let discovery = Arc::new(discover::RadioBrowser::new(&config.discovery)?);
    let daemon_core = Arc::new(core::DaemonCore::new(
        library,
        supervisor.clone(),
        discovery,
        config.preview.default_duration_secs,
    ));

    let server = socket::ControlServer::bind(
        &config.daemon.control_socket_path(),
        daemon_core,
        Duration::from_millis(config.daemon.request_timeout_ms),
    )?;
    info!("Control socket: {:?}", server.path());

    let token = CancellationToken::new();
    let server_handle = tokio::spawn(server.serve(token.clone()));

    info!("Daemon initialised, waiting for requests");
    if let Err(e) = shutdown_signal().await {
        warn!("Signal handling failed, shutting down: {}", e);
    }

    info!("Shutdown requested ({})", supervisor.status_string().await);
    token.cancel();
    if let Err(e) = server_handle.await {
        warn!("Socket server task ended abnormally: {}", e);
    }
    supervisor.shutdown().await;
    info!("Daemon stopped");
    Ok(())
}
