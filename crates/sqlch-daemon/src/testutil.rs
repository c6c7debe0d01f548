//! In-memory stand-ins for mpv, discovery, enrichment and notifications.
use crate::discover::Discovery;
use crate::enrich::{Enricher, TrackInfo};
use crate::mpv::PropertyChannel;
use crate::notify::Notifier;
use crate::player::{LaunchMode, ManagedProcess, PlayerBackend};
use async_trait::async_trait;
use serde_json::Value;
use sqlch_proto::error::SqlchError;
use sqlch_proto::protocol::Candidate;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── channel ───────────────────────────────────────────────────────────────────

pub struct FakeChannel {
    reachable: AtomicBool,
    metadata: Mutex<Value>,
    pushed: Mutex<Vec<(String, String)>>,
}

impl FakeChannel {
    pub fn reachable() -> Self {
        Self {
            reachable: AtomicBool::new(true),
            metadata: Mutex::new(Value::Null),
            pushed: Mutex::new(Vec::new()),
        }
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }

    pub fn set_metadata(&self, metadata: Value) {
        *self.metadata.lock().unwrap() = metadata;
    }

    pub fn pushed(&self) -> Vec<(String, String)> {
        self.pushed.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), SqlchError> {
        if self.is_reachable() {
            Ok(())
        } else {
            Err(SqlchError::ChannelUnreachable("fake channel down".into()))
        }
    }
}

#[async_trait]
impl PropertyChannel for FakeChannel {
    async fn get_property(&self, name: &str) -> Result<Value, SqlchError> {
        self.check()?;
        match name {
            "metadata" => Ok(self.metadata.lock().unwrap().clone()),
            _ => Err(SqlchError::PlayerCommand("property unavailable".into())),
        }
    }

    async fn set_property_string(&self, name: &str, value: &str) -> Result<(), SqlchError> {
        self.check()?;
        self.pushed
            .lock()
            .unwrap()
            .push((name.to_string(), value.to_string()));
        Ok(())
    }
}

// ── enrichment ────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeEnricher {
    failures_left: AtomicU32,
    calls: AtomicUsize,
}

impl FakeEnricher {
    pub fn failing(times: u32) -> Self {
        Self {
            failures_left: AtomicU32::new(times),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Enricher for FakeEnricher {
    async fn enrich(&self, artist: Option<&str>, track: &str) -> anyhow::Result<TrackInfo> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            anyhow::bail!("lookup service unavailable");
        }
        Ok(TrackInfo {
            album: Some("Discovery".into()),
            year: Some("2001".into()),
            genres: vec!["house".into()],
            ..TrackInfo::bare(artist, track)
        })
    }
}

// ── discovery ─────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeDiscovery {
    results: Vec<Candidate>,
    fail: bool,
    panic: bool,
    calls: AtomicUsize,
}

impl FakeDiscovery {
    pub fn returning(results: Vec<Candidate>) -> Self {
        Self {
            results,
            ..Self::default()
        }
    }

    pub fn broken() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn panicking() -> Self {
        Self {
            panic: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Discovery for FakeDiscovery {
    async fn search(&self, _query: &str) -> anyhow::Result<Vec<Candidate>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panic {
            panic!("discovery exploded");
        }
        if self.fail {
            anyhow::bail!("discovery offline");
        }
        Ok(self.results.clone())
    }
}

pub fn candidate(name: &str, url: &str) -> Candidate {
    Candidate {
        name: name.into(),
        url: url.into(),
        ..Candidate::default()
    }
}

// ── notifications ─────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn titles(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(t, _)| t.clone()).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, body: &str) {
        self.sent
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
    }
}

// ── player backend ────────────────────────────────────────────────────────────

pub struct FakeBackend {
    pub channel: Arc<FakeChannel>,
    launches: Mutex<Vec<(String, LaunchMode)>>,
    running: AtomicBool,
    fail_launch: AtomicBool,
    quits: AtomicUsize,
    releases: AtomicUsize,
    pauses: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            channel: Arc::new(FakeChannel::reachable()),
            launches: Mutex::new(Vec::new()),
            running: AtomicBool::new(false),
            fail_launch: AtomicBool::new(false),
            quits: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
            pauses: AtomicUsize::new(0),
        }
    }

    /// Pretend a player from an earlier daemon run is still alive.
    pub fn with_orphan(self) -> Self {
        self.running.store(true, Ordering::SeqCst);
        self
    }

    pub fn fail_launches(&self) {
        self.fail_launch.store(true, Ordering::SeqCst);
    }

    pub fn launches(&self) -> Vec<(String, LaunchMode)> {
        self.launches.lock().unwrap().clone()
    }

    pub fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn quits(&self) -> usize {
        self.quits.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn pauses(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlayerBackend for FakeBackend {
    async fn launch(&self, url: &str, mode: LaunchMode) -> anyhow::Result<ManagedProcess> {
        if self.fail_launch.load(Ordering::SeqCst) {
            anyhow::bail!("mpv binary not found");
        }
        self.launches.lock().unwrap().push((url.to_string(), mode));
        self.running.store(true, Ordering::SeqCst);
        Ok(ManagedProcess::detached())
    }

    async fn wait_ready(&self) -> bool {
        self.is_reachable().await
    }

    async fn is_reachable(&self) -> bool {
        self.running() && self.channel.is_reachable()
    }

    async fn toggle_pause(&self) -> Result<(), SqlchError> {
        if !self.is_reachable().await {
            return Err(SqlchError::ChannelUnreachable("not running".into()));
        }
        self.pauses.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn request_quit(&self) {
        self.quits.fetch_add(1, Ordering::SeqCst);
    }

    async fn release(&self, _process: Option<ManagedProcess>) {
        self.releases.fetch_add(1, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
    }

    fn channel(&self) -> Arc<dyn PropertyChannel> {
        self.channel.clone()
    }
}
