//! In-memory stand-ins for the engine's capabilities.

use crate::error::ServiceError;
use crate::services::Classifier;
use crate::services::Clock;
use crate::services::FileCandidate;
use crate::services::HostingService;
use crate::services::Notification;
use crate::services::Notifier;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::DateTime;
use chrono::Local;
use chrono::TimeZone;
use chrono::Utc;
use imgsafe_misskey::Meta;
use imgsafe_vision::SafeSearchAnnotation;
use imgsafe_vision::encode_image;
use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex;

pub(crate) fn local(year: i32, month: u32, day: u32, hour: u32, min: u32) -> DateTime<Local> {
    Local
        .with_ymd_and_hms(year, month, day, hour, min, 0)
        .earliest()
        .unwrap()
}

/// File `f{n}` created `n` seconds after a fixed epoch, so ids sort the same
/// way as creation time.
pub(crate) fn file_with(n: u32, mime_type: &str, sensitive: bool, size: u64) -> FileCandidate {
    let base = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
    FileCandidate {
        id: format!("f{n}"),
        created_at: base + chrono::Duration::seconds(i64::from(n)),
        mime_type: mime_type.to_string(),
        already_sensitive: sensitive,
        size: Some(size),
        url: Some(format!("https://files.example/f{n}.png")),
        download_url: Some(format!("https://files.example/f{n}.png")),
        user_id: Some(format!("user{n}")),
    }
}

pub(crate) fn file(n: u32) -> FileCandidate {
    file_with(n, "image/png", false, 100)
}

#[derive(Default)]
struct HostingInner {
    files: Vec<FileCandidate>,
    list_calls: Vec<Option<String>>,
    detail_calls: Vec<String>,
    downloads: Vec<String>,
    flagged: Vec<String>,
    missing_images: HashSet<String>,
    failing_flags: HashSet<String>,
    list_error: bool,
}

/// Mimics Misskey's `sinceId` paging: the oldest `limit` files after the
/// cursor, in ascending order.
#[derive(Clone, Default)]
pub(crate) struct FakeHosting {
    inner: Arc<Mutex<HostingInner>>,
}

impl FakeHosting {
    pub(crate) fn new(mut files: Vec<FileCandidate>) -> Self {
        files.sort_by_key(|f| f.created_at);
        Self {
            inner: Arc::new(Mutex::new(HostingInner {
                files,
                ..HostingInner::default()
            })),
        }
    }

    pub(crate) fn push(&self, file: FileCandidate) {
        let mut inner = self.inner.lock().unwrap();
        inner.files.push(file);
        inner.files.sort_by_key(|f| f.created_at);
    }

    pub(crate) fn remove_image(&self, id: &str) {
        self.inner
            .lock()
            .unwrap()
            .missing_images
            .insert(id.to_string());
    }

    pub(crate) fn fail_flag(&self, id: &str) {
        self.inner
            .lock()
            .unwrap()
            .failing_flags
            .insert(id.to_string());
    }

    pub(crate) fn heal_flags(&self) {
        self.inner.lock().unwrap().failing_flags.clear();
    }

    pub(crate) fn fail_listing(&self, fail: bool) {
        self.inner.lock().unwrap().list_error = fail;
    }

    pub(crate) fn list_calls(&self) -> Vec<Option<String>> {
        self.inner.lock().unwrap().list_calls.clone()
    }

    pub(crate) fn detail_calls(&self) -> Vec<String> {
        self.inner.lock().unwrap().detail_calls.clone()
    }

    pub(crate) fn downloads(&self) -> Vec<String> {
        self.inner.lock().unwrap().downloads.clone()
    }

    pub(crate) fn flagged(&self) -> Vec<String> {
        self.inner.lock().unwrap().flagged.clone()
    }

    pub(crate) fn is_sensitive(&self, id: &str) -> bool {
        self.inner
            .lock()
            .unwrap()
            .files
            .iter()
            .any(|f| f.id == id && f.already_sensitive)
    }
}

#[async_trait]
impl HostingService for FakeHosting {
    async fn list_files(
        &self,
        limit: u32,
        since_id: Option<&str>,
    ) -> Result<Vec<FileCandidate>, ServiceError> {
        let mut inner = self.inner.lock().unwrap();
        inner.list_calls.push(since_id.map(str::to_string));
        if inner.list_error {
            return Err(ServiceError::Transport("connection reset".to_string()));
        }
        let start = match since_id {
            Some(id) => inner
                .files
                .iter()
                .position(|f| f.id == id)
                .map_or(0, |idx| idx + 1),
            None => 0,
        };
        let page: Vec<FileCandidate> = inner
            .files
            .iter()
            .skip(start)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok(page)
    }

    async fn file_detail(&self, file_id: &str) -> Result<FileCandidate, ServiceError> {
        let mut inner = self.inner.lock().unwrap();
        inner.detail_calls.push(file_id.to_string());
        inner
            .files
            .iter()
            .find(|f| f.id == file_id)
            .cloned()
            .ok_or(ServiceError::NotFound)
    }

    async fn download(&self, url: &str) -> Result<Bytes, ServiceError> {
        let mut inner = self.inner.lock().unwrap();
        inner.downloads.push(url.to_string());
        let id = url
            .trim_start_matches("https://files.example/")
            .trim_end_matches(".png")
            .to_string();
        if inner.missing_images.contains(&id) {
            return Err(ServiceError::NotFound);
        }
        Ok(Bytes::from(id.into_bytes()))
    }

    async fn set_sensitive(&self, file_id: &str, sensitive: bool) -> Result<(), ServiceError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.failing_flags.contains(file_id) {
            return Err(ServiceError::Transport("connection reset".to_string()));
        }
        inner.flagged.push(file_id.to_string());
        if let Some(file) = inner.files.iter_mut().find(|f| f.id == file_id) {
            file.already_sensitive = sensitive;
        }
        Ok(())
    }

    async fn instance_meta(&self) -> Result<Meta, ServiceError> {
        Ok(Meta {
            version: "13.14.2".to_string(),
            name: Some("fake".to_string()),
            uri: None,
            description: None,
            maintainer_name: None,
        })
    }
}

/// Scores images by the file id the fake hosting service encodes in them;
/// unknown images score neutral.
#[derive(Clone, Default)]
pub(crate) struct FakeClassifier {
    scores: Arc<Mutex<HashMap<String, SafeSearchAnnotation>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeClassifier {
    pub(crate) fn score(&self, file_id: &str, annotation: SafeSearchAnnotation) {
        self.scores
            .lock()
            .unwrap()
            .insert(encode_image(file_id.as_bytes()), annotation);
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Classifier for FakeClassifier {
    async fn classify(&self, image_base64: &str) -> SafeSearchAnnotation {
        self.calls.lock().unwrap().push(image_base64.to_string());
        self.scores
            .lock()
            .unwrap()
            .get(image_base64)
            .copied()
            .unwrap_or_default()
    }
}

#[derive(Clone, Default)]
pub(crate) struct FakeNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
    fail: bool,
}

impl FakeNotifier {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(crate) fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), ServiceError> {
        self.sent.lock().unwrap().push(notification.clone());
        if self.fail {
            return Err(ServiceError::Transport("webhook down".to_string()));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub(crate) struct FixedClock {
    now: Arc<Mutex<DateTime<Local>>>,
}

impl FixedClock {
    pub(crate) fn at(now: DateTime<Local>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub(crate) fn set(&self, now: DateTime<Local>) {
        *self.now.lock().unwrap() = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        *self.now.lock().unwrap()
    }
}
