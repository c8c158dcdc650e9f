//! Capabilities the engine consumes, and their implementations for the
//! concrete Misskey and Cloud Vision clients.

use crate::error::ServiceError;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::DateTime;
use chrono::Local;
use chrono::Utc;
use imgsafe_http_client::HttpTransport;
use imgsafe_misskey::DriveFile;
use imgsafe_misskey::Meta;
use imgsafe_misskey::MisskeyClient;
use imgsafe_vision::SafeSearchAnnotation;
use imgsafe_vision::VisionClient;
use tracing::info;

/// A hosted file as far as moderation is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub mime_type: String,
    pub already_sensitive: bool,
    pub size: Option<u64>,
    /// Canonical file URL, as reported to webhooks.
    pub url: Option<String>,
    /// Where the image is fetched from, see [`DriveFile::preferred_url`].
    pub download_url: Option<String>,
    pub user_id: Option<String>,
}

impl From<DriveFile> for FileCandidate {
    fn from(file: DriveFile) -> Self {
        let download_url = file.preferred_url().map(str::to_string);
        Self {
            id: file.id,
            created_at: file.created_at,
            mime_type: file.mime_type,
            already_sensitive: file.is_sensitive,
            size: file.size,
            url: file.url,
            download_url,
            user_id: file.user_id,
        }
    }
}

#[async_trait]
pub trait HostingService: Send + Sync {
    /// The oldest `limit` local files created after `since_id`, in no
    /// guaranteed order.
    async fn list_files(
        &self,
        limit: u32,
        since_id: Option<&str>,
    ) -> Result<Vec<FileCandidate>, ServiceError>;

    async fn file_detail(&self, file_id: &str) -> Result<FileCandidate, ServiceError>;

    async fn download(&self, url: &str) -> Result<Bytes, ServiceError>;

    async fn set_sensitive(&self, file_id: &str, sensitive: bool) -> Result<(), ServiceError>;

    async fn instance_meta(&self) -> Result<Meta, ServiceError>;
}

#[async_trait]
pub trait Classifier: Send + Sync {
    /// Never fails; an unclassifiable image yields the neutral annotation.
    async fn classify(&self, image_base64: &str) -> SafeSearchAnnotation;
}

/// What a webhook is told about a flagged file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub file_id: String,
    pub file_url: Option<String>,
    pub file_size: Option<u64>,
    pub author_id: Option<String>,
    pub scores: SafeSearchAnnotation,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), ServiceError>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

#[async_trait]
impl<T: HttpTransport> HostingService for MisskeyClient<T> {
    async fn list_files(
        &self,
        limit: u32,
        since_id: Option<&str>,
    ) -> Result<Vec<FileCandidate>, ServiceError> {
        let files = MisskeyClient::list_files(self, limit, since_id).await?;
        Ok(files.into_iter().map(FileCandidate::from).collect())
    }

    async fn file_detail(&self, file_id: &str) -> Result<FileCandidate, ServiceError> {
        Ok(self.show_file(file_id).await?.into())
    }

    async fn download(&self, url: &str) -> Result<Bytes, ServiceError> {
        Ok(MisskeyClient::download(self, url).await?)
    }

    async fn set_sensitive(&self, file_id: &str, sensitive: bool) -> Result<(), ServiceError> {
        Ok(self.update_sensitive(file_id, sensitive).await?)
    }

    async fn instance_meta(&self) -> Result<Meta, ServiceError> {
        Ok(self.meta().await?)
    }
}

#[async_trait]
impl<T: HttpTransport> Classifier for VisionClient<T> {
    async fn classify(&self, image_base64: &str) -> SafeSearchAnnotation {
        self.safe_search(image_base64).await
    }
}

/// Startup connectivity check against the hosting service.
pub async fn probe_instance<H: HostingService + ?Sized>(hosting: &H) -> Result<Meta, ServiceError> {
    let meta = hosting.instance_meta().await?;
    info!(
        version = %meta.version,
        name = meta.name.as_deref().unwrap_or("unknown"),
        "connected to instance"
    );
    Ok(meta)
}
