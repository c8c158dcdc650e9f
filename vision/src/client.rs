use crate::error::VisionError;
use crate::models::AnnotateImageRequest;
use crate::models::AnnotateRequest;
use crate::models::AnnotateResponse;
use crate::models::Feature;
use crate::models::Image;
use crate::models::SafeSearchAnnotation;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use imgsafe_http_client::HttpTransport;
use imgsafe_http_client::Request;
use tracing::debug;
use tracing::warn;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://vision.googleapis.com";

const ANNOTATE_PATH: &str = "v1/images:annotate";
const SAFE_SEARCH_FEATURE: &str = "SAFE_SEARCH_DETECTION";

/// Base64-encodes raw image bytes for the `image.content` field.
pub fn encode_image(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub struct VisionClient<T: HttpTransport> {
    transport: T,
    base_url: String,
    api_key: String,
}

impl<T: HttpTransport> VisionClient<T> {
    pub fn new(transport: T, api_key: impl Into<String>) -> Self {
        Self::with_base_url(transport, DEFAULT_BASE_URL, api_key)
    }

    pub fn with_base_url(
        transport: T,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Runs SafeSearch detection and never fails: transport errors, API
    /// errors and malformed payloads all yield the neutral annotation.
    pub async fn safe_search(&self, image_base64: &str) -> SafeSearchAnnotation {
        match self.annotate(image_base64).await {
            Ok(annotation) => annotation,
            Err(err) => {
                warn!("safe search detection failed: {err}");
                SafeSearchAnnotation::default()
            }
        }
    }

    pub async fn annotate(&self, image_base64: &str) -> Result<SafeSearchAnnotation, VisionError> {
        let body = AnnotateRequest {
            requests: vec![AnnotateImageRequest {
                image: Image {
                    content: image_base64,
                },
                features: vec![Feature {
                    kind: SAFE_SEARCH_FEATURE,
                }],
            }],
        };
        let req = Request::post(self.annotate_url()?).with_json(&body);
        let resp = self.transport.execute(req).await?;

        let parsed: AnnotateResponse =
            resp.decode_json().map_err(|source| VisionError::Decode {
                source,
                body: resp.body_lossy(),
            })?;
        let Some(first) = parsed.responses.into_iter().next() else {
            return Err(VisionError::MissingAnnotation);
        };
        if let Some(status) = first.error {
            return Err(VisionError::Api {
                code: status.code,
                message: status.message,
            });
        }
        let annotation = first
            .safe_search_annotation
            .ok_or(VisionError::MissingAnnotation)?;
        debug!(%annotation, "safe search result");
        Ok(annotation)
    }

    fn annotate_url(&self) -> Result<String, VisionError> {
        let url = Url::parse_with_params(
            &format!("{}/{ANNOTATE_PATH}", self.base_url),
            &[("key", self.api_key.as_str()), ("alt", "json")],
        )?;
        Ok(url.into())
    }
}
