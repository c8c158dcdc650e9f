use crate::error::ServiceError;
use crate::services::Notification;
use crate::services::Notifier;
use async_trait::async_trait;
use imgsafe_http_client::HttpTransport;
use imgsafe_http_client::Request;
use std::time::Duration;
use tracing::debug;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(30);

/// Substitutes `{fileId}`, `{fileUrl}`, `{fileSize}`, `{authorUser}` and
/// `{checkResult}` in `template`. Values are inserted verbatim.
pub fn render_template(template: &str, notification: &Notification) -> String {
    template
        .replace("{fileId}", &notification.file_id)
        .replace(
            "{fileUrl}",
            notification.file_url.as_deref().unwrap_or("unknown"),
        )
        .replace(
            "{fileSize}",
            &notification.file_size.unwrap_or(0).to_string(),
        )
        .replace(
            "{authorUser}",
            notification.author_id.as_deref().unwrap_or("unknown"),
        )
        .replace("{checkResult}", &notification.scores.to_string())
}

/// Posts the rendered template to a fixed URL as a JSON body.
pub struct WebhookNotifier<T: HttpTransport> {
    transport: T,
    url: String,
    template: String,
}

impl<T: HttpTransport> WebhookNotifier<T> {
    pub fn new(transport: T, url: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            transport,
            url: url.into(),
            template: template.into(),
        }
    }
}

#[async_trait]
impl<T: HttpTransport> Notifier for WebhookNotifier<T> {
    async fn notify(&self, notification: &Notification) -> Result<(), ServiceError> {
        let body = render_template(&self.template, notification);
        let req = Request::post(self.url.as_str())
            .with_json_text(body)
            .with_timeout(WEBHOOK_TIMEOUT);
        let resp = self.transport.execute(req).await?;
        debug!(file_id = %notification.file_id, status = %resp.status, "webhook delivered");
        Ok(())
    }
}
