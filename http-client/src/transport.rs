use crate::default_client::ImgsafeHttpClient;
use crate::default_client::ImgsafeRequestBuilder;
use crate::default_client::describe_error;
use crate::default_client::redact_json;
use crate::default_client::redact_url;
use crate::error::TransportError;
use crate::request::Request;
use crate::request::RequestBody;
use crate::request::Response;
use async_trait::async_trait;
use tracing::Level;
use tracing::enabled;
use tracing::trace;

/// Executes one HTTP exchange. Implementations must map every non-2xx status
/// to [`TransportError::Http`] so callers can branch on the status code.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, req: Request) -> Result<Response, TransportError>;
}

#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: ImgsafeHttpClient,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client: ImgsafeHttpClient::new(client),
        }
    }

    fn build(&self, req: Request) -> ImgsafeRequestBuilder {
        let Request {
            method,
            url,
            headers,
            body,
            timeout,
        } = req;

        let mut builder = self.client.request(method, &url);

        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        builder = builder.headers(headers);
        match body {
            Some(RequestBody::Json(value)) => builder.json(&value),
            Some(RequestBody::Text { content_type, text }) => builder
                .header(http::header::CONTENT_TYPE, content_type)
                .body(text),
            None => builder,
        }
    }

    fn map_error(err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_builder() {
            TransportError::Build(describe_error(&err))
        } else {
            TransportError::Network(describe_error(&err))
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, req: Request) -> Result<Response, TransportError> {
        if enabled!(Level::TRACE) {
            let body = match &req.body {
                Some(RequestBody::Json(value)) => redact_json(value).to_string(),
                Some(RequestBody::Text { text, .. }) => text.clone(),
                None => String::new(),
            };
            trace!("{} to {}: {}", req.method, redact_url(&req.url), body);
        }

        let url = redact_url(&req.url);
        let builder = self.build(req);
        let resp = builder.send().await.map_err(Self::map_error)?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = resp.bytes().await.map_err(Self::map_error)?;
        if !status.is_success() {
            let body = String::from_utf8(bytes.to_vec()).ok();
            return Err(TransportError::Http {
                status,
                url: Some(url),
                body,
            });
        }
        Ok(Response {
            status,
            headers,
            body: bytes,
        })
    }
}
