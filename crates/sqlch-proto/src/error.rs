use thiserror::Error;

/// Failures surfaced by the library store, the protocol layer and the
/// managed-process control channel.
#[derive(Debug, Error)]
pub enum SqlchError {
    /// A play query matched no library station and discovery did not yield
    /// exactly one candidate.
    #[error("could not resolve: {query}")]
    ResolutionAmbiguous { query: String, candidates: usize },

    #[error("station '{0}' not found")]
    NotFound(String),

    #[error("station id collision: '{0}'. Rename the station or edit the existing one.")]
    Collision(String),

    #[error("station '{0}' has no stream url")]
    MissingUrl(String),

    #[error("control channel unreachable: {0}")]
    ChannelUnreachable(String),

    /// The channel answered, but the command failed (`"error" != "success"`).
    #[error("mpv error: {0}")]
    PlayerCommand(String),

    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = SqlchError> = std::result::Result<T, E>;
