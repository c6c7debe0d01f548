//! Now-playing enrichment: turn an (artist, track) pair scraped from the
//! stream title into album/year/genre metadata.
use async_trait::async_trait;
use serde::Deserialize;
use sqlch_proto::config::EnrichmentConfig;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackInfo {
    pub artist: Option<String>,
    pub title: String,
    pub album: Option<String>,
    pub year: Option<String>,
    pub genres: Vec<String>,
}

impl TrackInfo {
    pub fn bare(artist: Option<&str>, track: &str) -> Self {
        Self {
            artist: artist.map(str::to_string),
            title: track.to_string(),
            ..Self::default()
        }
    }
}

#[async_trait]
pub trait Enricher: Send + Sync {
    async fn enrich(&self, artist: Option<&str>, track: &str) -> anyhow::Result<TrackInfo>;
}

/// Used when enrichment is disabled: echoes the split title back.
pub struct Passthrough;

#[async_trait]
impl Enricher for Passthrough {
    async fn enrich(&self, artist: Option<&str>, track: &str) -> anyhow::Result<TrackInfo> {
        Ok(TrackInfo::bare(artist, track))
    }
}

// ── MusicBrainz ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RecordingSearch {
    #[serde(default)]
    recordings: Vec<Recording>,
}

#[derive(Debug, Deserialize)]
struct Recording {
    #[serde(default)]
    releases: Vec<Release>,
    #[serde(default)]
    tags: Vec<Tag>,
}

#[derive(Debug, Deserialize)]
struct Release {
    title: String,
    #[serde(default)]
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Tag {
    name: String,
}

pub struct MusicBrainz {
    client: reqwest::Client,
    base_url: String,
}

impl MusicBrainz {
    pub fn new(config: &EnrichmentConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn query(artist: Option<&str>, track: &str) -> String {
        match artist {
            Some(a) => format!("artist:\"{}\" AND recording:\"{}\"", a, track),
            None => format!("recording:\"{}\"", track),
        }
    }
}

fn track_info_from_search(artist: Option<&str>, track: &str, search: RecordingSearch) -> TrackInfo {
    let mut info = TrackInfo::bare(artist, track);
    let Some(rec) = search.recordings.into_iter().next() else {
        return info;
    };
    if let Some(rel) = rec.releases.into_iter().next() {
        info.year = rel
            .date
            .as_deref()
            .and_then(|d| d.split('-').next())
            .filter(|y| !y.is_empty())
            .map(str::to_string);
        info.album = Some(rel.title);
    }
    info.genres = rec.tags.into_iter().map(|t| t.name).collect();
    info
}

#[async_trait]
impl Enricher for MusicBrainz {
    async fn enrich(&self, artist: Option<&str>, track: &str) -> anyhow::Result<TrackInfo> {
        let url = format!("{}/recording/", self.base_url);
        let query = Self::query(artist, track);
        debug!("enrich: musicbrainz query {}", query);
        let search: RecordingSearch = self
            .client
            .get(&url)
            .query(&[("query", query.as_str()), ("fmt", "json"), ("limit", "1")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(track_info_from_search(artist, track, search))
    }
}
