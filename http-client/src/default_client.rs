use http::Error as HttpError;
use reqwest::IntoUrl;
use reqwest::Method;
use reqwest::Response;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderName;
use reqwest::header::HeaderValue;
use serde::Serialize;
use std::time::Duration;
use url::Url;

/// Query parameters whose values must never reach the logs.
const SECRET_QUERY_PARAMS: &[&str] = &["key", "i", "token", "access_token"];

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub fn build_reqwest_client(user_agent: &str) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .timeout(DEFAULT_REQUEST_TIMEOUT)
        .build()
}

/// Returns `url` with the values of credential-bearing query parameters
/// replaced, so it can be logged.
pub fn redact_url(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };
    if parsed.query().is_none() {
        return url.to_string();
    }
    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| {
            let value = if SECRET_QUERY_PARAMS.contains(&k.as_ref()) {
                "REDACTED".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), value)
        })
        .collect();
    parsed.query_pairs_mut().clear().extend_pairs(pairs);
    parsed.to_string()
}

/// Returns `body` with top-level credential fields replaced, so it can be
/// logged. Misskey carries its access token in the `i` field.
pub fn redact_json(body: &serde_json::Value) -> serde_json::Value {
    let mut redacted = body.clone();
    if let Some(map) = redacted.as_object_mut() {
        for (key, value) in map.iter_mut() {
            if SECRET_QUERY_PARAMS.contains(&key.as_str()) {
                *value = serde_json::Value::String("REDACTED".to_string());
            }
        }
    }
    redacted
}

/// Renders a reqwest error without leaking credentials embedded in its URL.
pub(crate) fn describe_error(error: &reqwest::Error) -> String {
    let message = error.to_string();
    match error.url() {
        Some(raw_url) => message.replace(raw_url.as_str(), &redact_url(raw_url.as_str())),
        None => message,
    }
}

#[derive(Clone, Debug)]
pub struct ImgsafeHttpClient {
    inner: reqwest::Client,
}

impl ImgsafeHttpClient {
    pub fn new(inner: reqwest::Client) -> Self {
        Self { inner }
    }

    pub fn request<U>(&self, method: Method, url: U) -> ImgsafeRequestBuilder
    where
        U: IntoUrl,
    {
        let url_str = redact_url(url.as_str());
        ImgsafeRequestBuilder::new(self.inner.request(method.clone(), url), method, url_str)
    }
}

#[must_use = "requests are not sent unless `send` is awaited"]
#[derive(Debug)]
pub struct ImgsafeRequestBuilder {
    builder: reqwest::RequestBuilder,
    method: Method,
    url: String,
}

impl ImgsafeRequestBuilder {
    fn new(builder: reqwest::RequestBuilder, method: Method, url: String) -> Self {
        Self {
            builder,
            method,
            url,
        }
    }

    fn map(self, f: impl FnOnce(reqwest::RequestBuilder) -> reqwest::RequestBuilder) -> Self {
        Self {
            builder: f(self.builder),
            method: self.method,
            url: self.url,
        }
    }

    pub fn headers(self, headers: HeaderMap) -> Self {
        self.map(|builder| builder.headers(headers))
    }

    pub fn header<K, V>(self, key: K, value: V) -> Self
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<HttpError>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<HttpError>,
    {
        self.map(|builder| builder.header(key, value))
    }

    pub fn timeout(self, timeout: Duration) -> Self {
        self.map(|builder| builder.timeout(timeout))
    }

    pub fn json<T>(self, value: &T) -> Self
    where
        T: ?Sized + Serialize,
    {
        self.map(|builder| builder.json(value))
    }

    pub fn body(self, body: impl Into<reqwest::Body>) -> Self {
        self.map(|builder| builder.body(body))
    }

    pub async fn send(self) -> Result<Response, reqwest::Error> {
        match self.builder.send().await {
            Ok(response) => {
                tracing::debug!(
                    method = %self.method,
                    url = %self.url,
                    status = %response.status(),
                    "Request completed"
                );

                Ok(response)
            }
            Err(error) => {
                let status = error.status();
                let message = describe_error(&error);
                tracing::debug!(
                    method = %self.method,
                    url = %self.url,
                    status = status.map(|s| s.as_u16()),
                    error = %message,
                    "Request failed"
                );
                Err(error)
            }
        }
    }
}
