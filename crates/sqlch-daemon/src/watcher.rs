//! Now-playing metadata watcher.
//!
//! mpv offers no push notification that carries the enriched fields we
//! want, so the watcher polls `metadata` on a fixed interval.  When the ICY
//! title changes it is split into (artist, track), enriched, and written
//! back into mpv's `user-data/*` namespace where the MPRIS script picks it
//! up.
//!
//! Failures inside one poll are swallowed.  The loop ends only when its
//! token is cancelled or the channel stays unreachable for
//! `max_missed_polls` consecutive polls.  In the second case the
//! `on_lost` callback runs, so the owner can drop the dead session.
use crate::enrich::{Enricher, TrackInfo};
use crate::mpv::PropertyChannel;
use serde_json::Value;
use sqlch_proto::config::WatcherConfig;
use sqlch_proto::error::SqlchError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct WatcherSettings {
    pub poll_interval: Duration,
    pub max_missed_polls: u32,
    pub enrich_attempts: u32,
}

impl From<&WatcherConfig> for WatcherSettings {
    fn from(config: &WatcherConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.poll_interval_ms.max(10)),
            max_missed_polls: config.max_missed_polls.max(1),
            enrich_attempts: config.enrich_attempts.max(1),
        }
    }
}

/// Split a stream title into (artist, track).
///
/// `"Daft Punk - One More Time"` → (`Some("Daft Punk")`, `"One More Time"`);
/// failing `" - "` the first bare `-` is used; a title with neither is all
/// track.
pub fn split_title(raw: &str) -> (Option<String>, String) {
    let raw = raw.trim();
    let Some((artist, track)) = raw.split_once(" - ").or_else(|| raw.split_once('-')) else {
        return (None, raw.to_string());
    };
    let artist = artist.trim();
    let artist = (!artist.is_empty()).then(|| artist.to_string());
    (artist, track.trim().to_string())
}

fn now_playing_title(metadata: &Value) -> Option<&str> {
    ["icy-title", "title"]
        .iter()
        .filter_map(|key| metadata.get(*key).and_then(|v| v.as_str()))
        .map(str::trim)
        .find(|t| !t.is_empty())
}

/// Handle to a running watcher task.  Dropping it stops the task.
pub struct MetadataWatcher {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    Cancelled,
    ChannelLost,
}

impl MetadataWatcher {
    pub fn spawn<F, Fut>(
        channel: Arc<dyn PropertyChannel>,
        enricher: Arc<dyn Enricher>,
        station_name: String,
        settings: WatcherSettings,
        on_lost: F,
    ) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let worker = Worker {
            channel,
            enricher,
            station_name,
            settings,
            token: token.clone(),
            published: None,
            pending: None,
        };
        let handle = tokio::spawn(async move {
            if worker.run().await == Exit::ChannelLost {
                on_lost().await;
            }
        });
        Self { token, handle }
    }

    /// Signal the task to exit; it notices on its next wake-up.
    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for MetadataWatcher {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

struct Worker {
    channel: Arc<dyn PropertyChannel>,
    enricher: Arc<dyn Enricher>,
    station_name: String,
    settings: WatcherSettings,
    token: CancellationToken,
    /// Last title whose metadata made it into mpv.
    published: Option<String>,
    /// Title currently being worked on and the attempts spent on it.
    pending: Option<(String, u32)>,
}

impl Worker {
    async fn run(mut self) -> Exit {
        debug!("watcher: started for '{}'", self.station_name);
        let mut missed = 0u32;

        while !self.token.is_cancelled() {
            match self.channel.get_property("metadata").await {
                Ok(metadata) => {
                    missed = 0;
                    if let Some(title) = now_playing_title(&metadata) {
                        if self.published.as_deref() != Some(title) {
                            let title = title.to_string();
                            self.handle_title(title).await;
                        }
                    }
                }
                Err(SqlchError::ChannelUnreachable(e)) => {
                    missed += 1;
                    debug!("watcher: channel miss {}/{}: {}", missed, self.settings.max_missed_polls, e);
                    if missed >= self.settings.max_missed_polls {
                        info!("watcher: channel gone, stopping for '{}'", self.station_name);
                        return Exit::ChannelLost;
                    }
                }
                // mpv answers "property unavailable" while buffering.
                Err(e) => debug!("watcher: metadata not available: {}", e),
            }

            tokio::select! {
                _ = self.token.cancelled() => break,
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
            }
        }
        debug!("watcher: stopped for '{}'", self.station_name);
        Exit::Cancelled
    }

    async fn handle_title(&mut self, title: String) {
        let (artist, track) = split_title(&title);
        if track.is_empty() {
            self.published = Some(title);
            self.pending = None;
            return;
        }

        let attempt = match &self.pending {
            Some((t, n)) if *t == title => n + 1,
            _ => 1,
        };
        self.pending = Some((title.clone(), attempt));

        let Some(info) = self.lookup(artist.as_deref(), &track, attempt).await else {
            return;
        };

        match self.publish(&info).await {
            Ok(()) => {
                info!("watcher: now playing '{}'", title);
                self.published = Some(title);
                self.pending = None;
            }
            Err(e) => debug!("watcher: publish failed, retrying: {}", e),
        }
    }

    /// Enrichment with a per-title attempt budget.  Once the budget is
    /// spent, the raw split is used instead.
    async fn lookup(&self, artist: Option<&str>, track: &str, attempt: u32) -> Option<TrackInfo> {
        if attempt > self.settings.enrich_attempts {
            return Some(TrackInfo::bare(artist, track));
        }
        match self.enricher.enrich(artist, track).await {
            Ok(info) => Some(info),
            Err(e) if attempt >= self.settings.enrich_attempts => {
                warn!("watcher: enrichment gave up on '{}': {}", track, e);
                Some(TrackInfo::bare(artist, track))
            }
            Err(e) => {
                debug!("watcher: enrichment attempt {} failed: {}", attempt, e);
                None
            }
        }
    }

    async fn set_user_data(&self, key: &str, value: &str) -> Result<(), SqlchError> {
        self.channel
            .set_property_string(&format!("user-data/{}", key), value)
            .await
    }

    async fn publish(&self, info: &TrackInfo) -> Result<(), SqlchError> {
        self.set_user_data("title", &info.title).await?;
        if let Some(artist) = &info.artist {
            self.set_user_data("artist", artist).await?;
        }
        let album = info.album.as_deref().unwrap_or(&self.station_name);
        self.set_user_data("album", album).await?;
        if let Some(year) = &info.year {
            self.set_user_data("date", year).await?;
        }
        if !info.genres.is_empty() {
            self.set_user_data("genre", &info.genres.join(", ")).await?;
        }
        Ok(())
    }
}
