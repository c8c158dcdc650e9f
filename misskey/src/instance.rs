use imgsafe_http_client::Request;
use serde_json::Map;
use serde_json::Value;

/// Location and credentials of a Misskey instance.
///
/// Misskey authenticates API calls with an `i` field in the JSON body rather
/// than a header, so [`Instance::build_request`] injects the token into every
/// payload it builds.
#[derive(Debug, Clone)]
pub struct Instance {
    pub base_url: String,
    token: String,
}

impl Instance {
    /// `hostname` may be a bare host (`misskey.example`) or carry an explicit
    /// `http://`/`https://` scheme; bare hosts default to https.
    pub fn new(hostname: &str, token: impl Into<String>) -> Self {
        let trimmed = hostname.trim().trim_end_matches('/');
        let base_url = if trimmed.starts_with("https://") || trimmed.starts_with("http://") {
            trimmed.to_string()
        } else {
            format!("https://{trimmed}")
        };
        Self {
            base_url,
            token: token.into(),
        }
    }

    pub fn url_for_path(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!("{}/{path}", self.base_url)
    }

    /// Builds a POST to `path` whose JSON body is `params` plus the access
    /// token. `params` must serialize to a JSON object (or null).
    pub fn build_request(&self, path: &str, params: Value) -> Request {
        let mut body = match params {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        body.insert("i".to_string(), Value::String(self.token.clone()));
        Request::post(self.url_for_path(path)).with_json(&Value::Object(body))
    }
}
