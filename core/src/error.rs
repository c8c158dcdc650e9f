use http::StatusCode;
use imgsafe_http_client::TransportError;
use imgsafe_misskey::MisskeyError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure of a remote capability call, as seen by the engine.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The remote resource is gone (HTTP 404 or 410).
    #[error("resource not found")]
    NotFound,

    #[error("request rejected with {status}: {}", body.as_deref().unwrap_or_default())]
    Rejected {
        status: StatusCode,
        body: Option<String>,
    },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Decode(String),
}

impl From<TransportError> for ServiceError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Http { status, .. }
                if status == StatusCode::NOT_FOUND || status == StatusCode::GONE =>
            {
                ServiceError::NotFound
            }
            TransportError::Http { status, body, .. } => ServiceError::Rejected { status, body },
            other => ServiceError::Transport(other.to_string()),
        }
    }
}

impl From<MisskeyError> for ServiceError {
    fn from(err: MisskeyError) -> Self {
        match err {
            MisskeyError::Transport(err) => err.into(),
            err @ MisskeyError::Decode { .. } => ServiceError::Decode(err.to_string()),
        }
    }
}

/// Aborts the current poll cycle. Progress persisted before the failure is
/// kept and the next tick resumes from it.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("hosting service call failed: {0}")]
    Service(#[from] ServiceError),

    #[error("failed to flag file {file_id}: {source}")]
    Action {
        file_id: String,
        #[source]
        source: ServiceError,
    },

    #[error("failed to persist state: {0}")]
    State(#[from] io::Error),

    #[error("cycle cancelled")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// No config existed; a commented default was written in its place.
    #[error(
        "no configuration found; wrote a default to {} - fill in the [authentication] section and restart",
        path.display()
    )]
    Missing { path: PathBuf },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
