use crate::error::CycleError;
use crate::evaluate::Verdict;
use crate::services::FileCandidate;
use crate::services::HostingService;
use crate::services::Notification;
use crate::services::Notifier;
use tracing::info;
use tracing::warn;

/// What [`Executor::apply`] did with a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Flagged,
    LeftAlone,
}

pub struct Executor<'a, H: ?Sized, N: ?Sized> {
    hosting: &'a H,
    notifier: Option<&'a N>,
}

impl<'a, H, N> Executor<'a, H, N>
where
    H: HostingService + ?Sized,
    N: Notifier + ?Sized,
{
    pub fn new(hosting: &'a H, notifier: Option<&'a N>) -> Self {
        Self { hosting, notifier }
    }

    /// Flags the file when the verdict says so, then notifies the webhook.
    /// Only the flag update can fail; notification errors are logged.
    pub async fn apply(
        &self,
        file: &FileCandidate,
        verdict: &Verdict,
    ) -> Result<ActionOutcome, CycleError> {
        if !verdict.should_mark_sensitive {
            return Ok(ActionOutcome::LeftAlone);
        }

        self.hosting
            .set_sensitive(&verdict.file_id, true)
            .await
            .map_err(|source| CycleError::Action {
                file_id: verdict.file_id.clone(),
                source,
            })?;
        info!(file_id = %verdict.file_id, scores = %verdict.scores, "marked file as sensitive");

        if let Some(notifier) = self.notifier {
            let notification = Notification {
                file_id: verdict.file_id.clone(),
                file_url: file.url.clone(),
                file_size: file.size,
                author_id: file.user_id.clone(),
                scores: verdict.scores,
            };
            if let Err(err) = notifier.notify(&notification).await {
                warn!(file_id = %verdict.file_id, "webhook notification failed: {err}");
            }
        }
        Ok(ActionOutcome::Flagged)
    }
}
