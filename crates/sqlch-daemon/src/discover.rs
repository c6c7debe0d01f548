//! Station discovery for play queries that miss the library.
use async_trait::async_trait;
use serde::Deserialize;
use sqlch_proto::config::DiscoveryConfig;
use sqlch_proto::library::{NewStation, Source, StreamInfo};
use sqlch_proto::protocol::Candidate;
use std::time::Duration;
use tracing::debug;

pub const RADIO_BROWSER_ORIGIN: &str = "radio-browser";

#[async_trait]
pub trait Discovery: Send + Sync {
    async fn search(&self, query: &str) -> anyhow::Result<Vec<Candidate>>;
}

/// Library entry for a discovered candidate, carrying its stream details.
pub fn new_station_from(candidate: &Candidate) -> NewStation {
    NewStation {
        name: candidate.name.clone(),
        url: candidate.url.clone(),
        category: None,
        tags: candidate.tags.clone(),
        stream: Some(StreamInfo {
            codec: candidate.codec.clone(),
            bitrate: candidate.bitrate,
            country: candidate.country.clone(),
            ..StreamInfo::default()
        }),
        source: Some(Source {
            country: candidate.country.clone(),
            codec: candidate.codec.clone(),
            bitrate: candidate.bitrate,
            homepage: candidate.homepage.clone(),
            uuid: candidate.uuid.clone(),
            ..Source::discovered(RADIO_BROWSER_ORIGIN)
        }),
    }
}

// ── radio-browser.info ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RbStation {
    #[serde(default)]
    name: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    url_resolved: String,
    /// Comma-separated.
    #[serde(default)]
    tags: String,
    #[serde(default)]
    country: String,
    #[serde(default)]
    codec: String,
    #[serde(default)]
    bitrate: u32,
    #[serde(default)]
    homepage: String,
    #[serde(default)]
    stationuuid: String,
}

fn non_empty(s: String) -> Option<String> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

impl From<RbStation> for Candidate {
    fn from(st: RbStation) -> Self {
        let url = if st.url_resolved.trim().is_empty() {
            st.url
        } else {
            st.url_resolved
        };
        Candidate {
            name: st.name.trim().to_string(),
            url,
            tags: st
                .tags
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
            country: non_empty(st.country),
            codec: non_empty(st.codec),
            bitrate: (st.bitrate > 0).then_some(st.bitrate),
            homepage: non_empty(st.homepage),
            uuid: non_empty(st.stationuuid),
        }
    }
}

pub struct RadioBrowser {
    client: reqwest::Client,
    base_url: String,
    limit: usize,
}

impl RadioBrowser {
    pub fn new(config: &DiscoveryConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!("sqlch/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            limit: config.limit,
        })
    }
}

fn candidates_from(stations: Vec<RbStation>) -> Vec<Candidate> {
    stations
        .into_iter()
        .map(Candidate::from)
        .filter(|c| !c.name.is_empty() && !c.url.is_empty())
        .collect()
}

#[async_trait]
impl Discovery for RadioBrowser {
    async fn search(&self, query: &str) -> anyhow::Result<Vec<Candidate>> {
        let url = format!("{}/stations/search", self.base_url);
        let limit = self.limit.to_string();
        debug!("discover: searching '{}'", query);
        let stations: Vec<RbStation> = self
            .client
            .get(&url)
            .query(&[
                ("name", query),
                ("limit", limit.as_str()),
                ("hidebroken", "true"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(candidates_from(stations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_mapping() {
        let body = r#"[
            {"name": " Jazz FM ", "url": "http://a/pls", "url_resolved": "http://a/stream",
             "tags": "jazz, smooth,,", "country": "UK", "codec": "MP3", "bitrate": 128,
             "homepage": "", "stationuuid": "abc"},
            {"name": "", "url": "http://nameless"},
            {"name": "No Url"}
        ]"#;
        let stations: Vec<RbStation> = serde_json::from_str(body).unwrap();
        let candidates = candidates_from(stations);
        assert_eq!(candidates.len(), 1);

        let c = &candidates[0];
        assert_eq!(c.name, "Jazz FM");
        assert_eq!(c.url, "http://a/stream");
        assert_eq!(c.tags, vec!["jazz", "smooth"]);
        assert_eq!(c.bitrate, Some(128));
        assert_eq!(c.homepage, None);
        assert_eq!(c.uuid.as_deref(), Some("abc"));
    }

    #[test]
    fn test_new_station_carries_discovery_metadata() {
        let candidate = Candidate {
            name: "KEXP".into(),
            url: "http://kexp".into(),
            country: Some("US".into()),
            codec: Some("AAC".into()),
            bitrate: Some(160),
            ..Candidate::default()
        };
        let new = new_station_from(&candidate);
        let source = new.source.unwrap();
        assert_eq!(source.kind, "discover");
        assert_eq!(source.origin, RADIO_BROWSER_ORIGIN);
        assert_eq!(source.bitrate, Some(160));
        assert_eq!(new.stream.unwrap().codec.as_deref(), Some("AAC"));
    }
}
