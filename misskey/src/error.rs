use imgsafe_http_client::TransportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MisskeyError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("failed to decode {endpoint} response: {source}; body: {body}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
        body: String,
    },
}

impl MisskeyError {
    /// True when the remote resource no longer exists (HTTP 404).
    pub fn is_not_found(&self) -> bool {
        match self {
            MisskeyError::Transport(err) => err.is_not_found(),
            MisskeyError::Decode { .. } => false,
        }
    }
}
