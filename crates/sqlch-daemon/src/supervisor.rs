//! Playback Supervisor: owns the single playback session.
//!
//! ```text
//!            play / preview               stop / expiry
//!   Idle ───────────────────▶ Playing ───────────────────▶ Idle
//!                             Previewing
//! ```
//!
//! Starting a session always tears the previous one down first, so at most
//! one managed process exists.  Pause is a property of the live process and
//! is not tracked here.
use crate::enrich::Enricher;
use crate::notify::Notifier;
use crate::player::{LaunchMode, ManagedProcess, PlayerBackend};
use crate::timer::PreviewTimer;
use crate::watcher::{MetadataWatcher, WatcherSettings};
use sqlch_proto::error::SqlchError;
use sqlch_proto::library::{LibraryStore, Station};
use sqlch_proto::protocol::SessionInfo;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const NOT_PLAYING: &str = "sqlch: Not Playing";
const PREVIEW_ALBUM: &str = "Preview";

struct Session {
    info: SessionInfo,
    generation: u64,
    process: Option<ManagedProcess>,
    watcher: Option<MetadataWatcher>,
    preview: Option<PreviewTimer>,
}

#[derive(Default)]
struct State {
    session: Option<Session>,
    /// Bumped for every new session.  Preview timers and watchers only act
    /// on the generation they were started for.
    generation: u64,
}

struct Inner {
    backend: Arc<dyn PlayerBackend>,
    library: Arc<LibraryStore>,
    enricher: Arc<dyn Enricher>,
    notifier: Arc<dyn Notifier>,
    watcher: WatcherSettings,
    state: Mutex<State>,
}

#[derive(Clone)]
pub struct Supervisor {
    inner: Arc<Inner>,
}

impl Supervisor {
    pub fn new(
        backend: Arc<dyn PlayerBackend>,
        library: Arc<LibraryStore>,
        enricher: Arc<dyn Enricher>,
        notifier: Arc<dyn Notifier>,
        watcher: WatcherSettings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                library,
                enricher,
                notifier,
                watcher,
                state: Mutex::new(State::default()),
            }),
        }
    }

    /// Replace whatever is playing with `station`.
    pub async fn play(&self, station: &Station) -> anyhow::Result<()> {
        let Some(url) = station.stream_url() else {
            self.inner.notifier.notify("sqlch error", "Station missing URL");
            return Err(SqlchError::MissingUrl(station.id.clone()).into());
        };

        let mut state = self.inner.state.lock().await;
        self.teardown(&mut state).await;

        self.inner.notifier.notify("Now Playing", &station.name);
        let process = self.inner.backend.launch(url, LaunchMode::Station).await?;
        let generation = self.begin(&mut state, SessionInfo::Station(station.clone()), process);
        info!("supervisor: playing '{}' (session {})", station.id, generation);

        if let Err(e) = self.inner.library.record_play(&station.id) {
            warn!("supervisor: could not record play for '{}': {}", station.id, e);
        }

        self.start_watcher(&mut state, &station.name).await;
        Ok(())
    }

    /// Play `url` for `duration_secs`, then stop.
    pub async fn preview(&self, url: &str, duration_secs: u64) -> anyhow::Result<()> {
        let url = url.trim();
        if url.is_empty() {
            return Err(SqlchError::MissingUrl("preview".into()).into());
        }

        let mut state = self.inner.state.lock().await;
        self.teardown(&mut state).await;

        self.inner.notifier.notify("Previewing", url);
        let process = self.inner.backend.launch(url, LaunchMode::Preview).await?;
        let info = SessionInfo::Preview {
            url: url.to_string(),
            duration_secs,
        };
        let generation = self.begin(&mut state, info, process);
        info!("supervisor: previewing {} for {}s (session {})", url, duration_secs, generation);

        let supervisor = self.clone();
        let timer = PreviewTimer::arm(Duration::from_secs(duration_secs), move || async move {
            supervisor.expire_preview(generation).await;
        });
        if let Some(session) = state.session.as_mut() {
            session.preview = Some(timer);
        }

        self.start_watcher(&mut state, PREVIEW_ALBUM).await;
        Ok(())
    }

    /// Tear down the current session.  Calling it while idle does nothing.
    pub async fn stop(&self) {
        let mut state = self.inner.state.lock().await;
        if self.teardown(&mut state).await {
            self.inner.notifier.notify("sqlch", "Playback stopped");
        } else {
            debug!("supervisor: stop while idle");
        }
    }

    /// Toggle pause on the live process.  A no-op when nothing answers.
    pub async fn pause(&self) -> anyhow::Result<()> {
        if !self.inner.backend.is_reachable().await {
            debug!("supervisor: pause ignored, player not reachable");
            return Ok(());
        }
        self.inner.backend.toggle_pause().await?;
        Ok(())
    }

    pub async fn current(&self) -> Option<SessionInfo> {
        let state = self.inner.state.lock().await;
        state.session.as_ref().map(|s| s.info.clone())
    }

    /// Status line and session descriptor from a single look at the state.
    pub async fn snapshot(&self) -> (String, Option<SessionInfo>) {
        let current = self.current().await;
        let status = current
            .as_ref()
            .map(SessionInfo::label)
            .unwrap_or_else(|| NOT_PLAYING.to_string());
        (status, current)
    }

    pub async fn status_string(&self) -> String {
        self.snapshot().await.0
    }

    /// Shut down a player left behind by an earlier daemon so that a fresh
    /// daemon's idle state matches reality.  Returns whether one was found.
    pub async fn reconcile(&self) -> bool {
        let state = self.inner.state.lock().await;
        if state.session.is_some() || !self.inner.backend.is_reachable().await {
            return false;
        }
        warn!("supervisor: found orphaned player from a previous run, shutting it down");
        self.inner.backend.request_quit().await;
        self.inner.backend.release(None).await;
        true
    }

    pub async fn shutdown(&self) {
        info!("supervisor: shutting down");
        self.stop().await;
    }

    async fn expire_preview(&self, generation: u64) {
        let mut state = self.inner.state.lock().await;
        let current = state.session.as_ref().map(|s| s.generation);
        if current != Some(generation) {
            debug!("supervisor: stale preview timer for session {} ignored", generation);
            return;
        }
        info!("supervisor: preview finished (session {})", generation);
        if self.teardown(&mut state).await {
            self.inner.notifier.notify("sqlch", "Preview finished");
        }
    }

    /// The watcher gave up on the player's channel: the process is gone, so
    /// the session is dropped the same way `stop` would.
    async fn player_lost(&self, generation: u64) {
        let mut state = self.inner.state.lock().await;
        let current = state.session.as_ref().map(|s| s.generation);
        if current != Some(generation) {
            debug!("supervisor: late channel loss for session {} ignored", generation);
            return;
        }
        warn!("supervisor: player for session {} went away", generation);
        if self.teardown(&mut state).await {
            self.inner.notifier.notify("sqlch", "Playback stopped");
        }
    }

    fn begin(&self, state: &mut State, info: SessionInfo, process: ManagedProcess) -> u64 {
        state.generation += 1;
        state.session = Some(Session {
            info,
            generation: state.generation,
            process: Some(process),
            watcher: None,
            preview: None,
        });
        state.generation
    }

    async fn start_watcher(&self, state: &mut State, album: &str) {
        if !self.inner.backend.wait_ready().await {
            warn!("supervisor: player never became reachable, no metadata watcher");
            return;
        }
        let Some(session) = state.session.as_mut() else {
            return;
        };
        let generation = session.generation;
        let supervisor = self.clone();
        session.watcher = Some(MetadataWatcher::spawn(
            self.inner.backend.channel(),
            self.inner.enricher.clone(),
            album.to_string(),
            self.inner.watcher.clone(),
            move || async move {
                supervisor.player_lost(generation).await;
            },
        ));
    }

    /// Returns whether there was a session to tear down.
    async fn teardown(&self, state: &mut State) -> bool {
        let Some(mut session) = state.session.take() else {
            return false;
        };
        if let Some(timer) = session.preview.take() {
            if !timer.is_finished() {
                timer.cancel();
            }
        }
        if let Some(watcher) = session.watcher.take() {
            if watcher.is_finished() {
                debug!("supervisor: watcher for session {} had already exited", session.generation);
            }
            watcher.stop();
        }
        self.inner.backend.request_quit().await;
        self.inner.backend.release(session.process.take()).await;
        debug!("supervisor: session {} torn down", session.generation);
        true
    }
}
