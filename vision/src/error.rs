use imgsafe_http_client::TransportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VisionError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("failed to decode annotate response: {source}; body: {body}")]
    Decode {
        #[source]
        source: serde_json::Error,
        body: String,
    },

    /// The request was accepted but the per-image result carried an error.
    #[error("vision api error {code}: {message}")]
    Api { code: i32, message: String },

    #[error("annotate response contained no safe search annotation")]
    MissingAnnotation,

    #[error("invalid vision base url: {0}")]
    Url(#[from] url::ParseError),
}
