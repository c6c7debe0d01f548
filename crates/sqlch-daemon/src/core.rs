//! Request dispatch.  Every request goes through `handle`, which never fails:
//! errors and panics from the handlers come back as error replies.
use crate::discover::{new_station_from, Discovery};
use crate::supervisor::Supervisor;
use futures_util::FutureExt;
use sqlch_proto::library::{LibraryStore, Station, LAST_PLAYED_QUERY};
use sqlch_proto::protocol::{preview_duration_secs, Reply, Request};
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub struct DaemonCore {
    library: Arc<LibraryStore>,
    supervisor: Supervisor,
    discovery: Arc<dyn Discovery>,
    preview_secs: u64,
}

/// Outcome of turning a play query into a station.
enum Resolution {
    Found(Station),
    Unresolved(Reply),
}

impl DaemonCore {
    pub fn new(
        library: Arc<LibraryStore>,
        supervisor: Supervisor,
        discovery: Arc<dyn Discovery>,
        preview_secs: u64,
    ) -> Self {
        Self {
            library,
            supervisor,
            discovery,
            preview_secs,
        }
    }

    /// Decode and handle one request line.
    pub async fn handle_line(&self, line: &str) -> Reply {
        match Request::decode(line) {
            Ok(request) => self.handle(request).await,
            Err(e) => {
                debug!("core: {}", e);
                Reply::error(e.to_string())
            }
        }
    }

    pub async fn handle(&self, request: Request) -> Reply {
        debug!("core: {:?}", request);
        match AssertUnwindSafe(self.dispatch(request)).catch_unwind().await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                warn!("core: request failed: {:#}", e);
                Reply::error(e.to_string())
            }
            Err(panic) => {
                let msg = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!("core: handler panicked: {}", msg);
                Reply::error(format!("internal error: {}", msg))
            }
        }
    }

    async fn dispatch(&self, request: Request) -> anyhow::Result<Reply> {
        match request {
            Request::Ping => Ok(Reply::pong()),
            Request::Status => {
                let (status, current) = self.supervisor.snapshot().await;
                Ok(Reply::status(status, current.as_ref()))
            }
            Request::Stop => {
                self.supervisor.stop().await;
                Ok(Reply::ok())
            }
            Request::Pause => {
                self.supervisor.pause().await?;
                Ok(Reply::ok())
            }
            Request::Play { query } => self.play(query.as_deref().unwrap_or_default()).await,
            Request::Preview { url, duration } => {
                self.preview(url.as_deref().unwrap_or_default(), duration.as_ref())
                    .await
            }
            Request::Unknown { cmd } => Ok(Reply::error(format!("unknown cmd: {}", cmd))),
        }
    }

    async fn play(&self, query: &str) -> anyhow::Result<Reply> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Reply::error("missing query"));
        }
        let station = match self.resolve(query).await? {
            Resolution::Found(station) => station,
            Resolution::Unresolved(reply) => return Ok(reply),
        };
        self.supervisor.play(&station).await?;
        Ok(Reply::playing(&station))
    }

    /// Library first, then discovery.  A single discovery hit is added to
    /// the library (reusing an existing entry with the same id).
    async fn resolve(&self, query: &str) -> anyhow::Result<Resolution> {
        if let Some(station) = self.library.find(query) {
            debug!("core: '{}' resolved from library to '{}'", query, station.id);
            return Ok(Resolution::Found(station));
        }
        if query == LAST_PLAYED_QUERY {
            return Ok(Resolution::Unresolved(Reply::unresolved(query, Vec::new())));
        }

        let mut candidates = match self.discovery.search(query).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!("core: discovery failed for '{}': {:#}", query, e);
                Vec::new()
            }
        };
        if candidates.len() != 1 {
            info!("core: '{}' unresolved ({} candidates)", query, candidates.len());
            return Ok(Resolution::Unresolved(Reply::unresolved(query, candidates)));
        }

        let candidate = candidates.remove(0);
        let station = self.library.add(new_station_from(&candidate), true)?;
        info!("core: '{}' discovered as '{}'", query, station.id);
        Ok(Resolution::Found(station))
    }

    async fn preview(&self, url: &str, duration: Option<&Value>) -> anyhow::Result<Reply> {
        let url = url.trim();
        if url.is_empty() {
            return Ok(Reply::error("missing url"));
        }
        let secs = preview_duration_secs(duration, self.preview_secs);
        self.supervisor.preview(url, secs).await?;
        Ok(Reply::ok())
    }
}
