//! `config.toml` loading. The raw file is parsed into [`ConfigToml`], whose
//! fields are all optional, and then resolved into [`Config`] with defaults
//! applied and required values checked.

use crate::error::ConfigError;
use crate::path_utils::write_atomically;
use serde::Deserialize;
use serde::Serialize;
use std::fmt;
use std::io;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// How often a poll cycle starts.
pub const POLL_PERIOD: Duration = Duration::from_secs(10 * 60);

pub const DEFAULT_JUDGING_SCORE: i32 = 15;
pub const DEFAULT_LIMIT_PER_MONTH: u32 = 1000;
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const DEFAULT_REQUEST_INTERVAL_MS: u64 = 1000;

/// Largest page `admin/drive/files` accepts.
pub const MAX_PAGE_SIZE: u32 = 100;

pub const DEFAULT_CONFIG_TOML: &str = r#"# imgsafe configuration

# Log at debug level unless RUST_LOG says otherwise.
debug = false

[authentication]
# Hostname of the Misskey instance, e.g. "misskey.example". Prefix with
# http:// to talk to an instance without TLS.
instance_hostname = ""
# Access token of an administrator or moderator account.
instance_key = ""
# Cloud Vision API key.
google_api_key = ""

[settings]
# Flag a file when its adult or violence likelihood reaches this score:
# VERY_UNLIKELY=0, UNLIKELY=5, POSSIBLE=10, LIKELY=15, VERY_LIKELY=20.
judging_score = 15
# Classification requests allowed per calendar month.
limit_per_month = 1000
# Images smaller than this many bytes are not checked.
checking_image_size_min = 0
# Files requested per listing call (1-100).
page_size = 10
# Pause between two checked files, in milliseconds.
request_interval_ms = 1000

[settings.webhook]
enable = false
url = ""
# Placeholders: {fileId} {fileUrl} {fileSize} {authorUser} {checkResult}
template = '{"content": "Marked {fileId} ({fileUrl}) uploaded by {authorUser} as sensitive: {checkResult}"}'
"#;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ConfigToml {
    pub debug: Option<bool>,
    #[serde(default)]
    pub authentication: AuthenticationToml,
    #[serde(default)]
    pub settings: SettingsToml,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct AuthenticationToml {
    pub instance_hostname: Option<String>,
    pub instance_key: Option<String>,
    pub google_api_key: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct SettingsToml {
    pub judging_score: Option<i32>,
    pub limit_per_month: Option<u32>,
    pub checking_image_size_min: Option<u64>,
    pub page_size: Option<u32>,
    pub request_interval_ms: Option<u64>,
    #[serde(default)]
    pub webhook: WebhookToml,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct WebhookToml {
    pub enable: Option<bool>,
    pub url: Option<String>,
    pub template: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookConfig {
    pub url: String,
    pub template: String,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub debug: bool,
    pub instance_hostname: String,
    pub instance_key: String,
    pub google_api_key: String,
    pub judging_score: i32,
    pub limit_per_month: u32,
    pub checking_image_size_min: u64,
    pub page_size: u32,
    pub request_interval: Duration,
    pub poll_period: Duration,
    /// `None` unless the webhook is enabled.
    pub webhook: Option<WebhookConfig>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("debug", &self.debug)
            .field("instance_hostname", &self.instance_hostname)
            .field("instance_key", &"<redacted>")
            .field("google_api_key", &"<redacted>")
            .field("judging_score", &self.judging_score)
            .field("limit_per_month", &self.limit_per_month)
            .field("checking_image_size_min", &self.checking_image_size_min)
            .field("page_size", &self.page_size)
            .field("request_interval", &self.request_interval)
            .field("poll_period", &self.poll_period)
            .field("webhook_url", &self.webhook.as_ref().map(|w| w.url.as_str()))
            .finish()
    }
}

impl Config {
    /// Reads and resolves `path`. A missing file is replaced by
    /// [`DEFAULT_CONFIG_TOML`] and reported as [`ConfigError::Missing`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                write_atomically(path, DEFAULT_CONFIG_TOML).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                info!(path = %path.display(), "wrote default configuration");
                return Err(ConfigError::Missing {
                    path: path.to_path_buf(),
                });
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let cfg: ConfigToml = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(cfg)
    }

    pub fn from_toml(cfg: ConfigToml) -> Result<Self, ConfigError> {
        let ConfigToml {
            debug,
            authentication,
            settings,
        } = cfg;

        let instance_hostname = required(
            "authentication.instance_hostname",
            authentication.instance_hostname,
        )?;
        let instance_key = required("authentication.instance_key", authentication.instance_key)?;
        let google_api_key = required(
            "authentication.google_api_key",
            authentication.google_api_key,
        )?;

        let page_size = settings.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(ConfigError::Invalid(format!(
                "settings.page_size must be between 1 and {MAX_PAGE_SIZE}, got {page_size}"
            )));
        }

        let webhook = if settings.webhook.enable.unwrap_or(false) {
            let url = required("settings.webhook.url", settings.webhook.url)?;
            let template = required("settings.webhook.template", settings.webhook.template)?;
            Some(WebhookConfig { url, template })
        } else {
            None
        };

        Ok(Self {
            debug: debug.unwrap_or(false),
            instance_hostname,
            instance_key,
            google_api_key,
            judging_score: settings.judging_score.unwrap_or(DEFAULT_JUDGING_SCORE),
            limit_per_month: settings.limit_per_month.unwrap_or(DEFAULT_LIMIT_PER_MONTH),
            checking_image_size_min: settings.checking_image_size_min.unwrap_or(0),
            page_size,
            request_interval: Duration::from_millis(
                settings
                    .request_interval_ms
                    .unwrap_or(DEFAULT_REQUEST_INTERVAL_MS),
            ),
            poll_period: POLL_PERIOD,
            webhook,
        })
    }
}

fn required(key: &str, value: Option<String>) -> Result<String, ConfigError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ConfigError::Invalid(format!("{key} must be set"))),
    }
}
