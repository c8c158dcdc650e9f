use crate::error::CycleError;
use crate::error::ServiceError;
use crate::quota::QuotaGovernor;
use crate::quota::Reservation;
use crate::services::Classifier;
use crate::services::FileCandidate;
use crate::services::HostingService;
use crate::state::PersistedState;
use crate::state::StateStore;
use chrono::DateTime;
use chrono::Local;
use imgsafe_vision::SafeSearchAnnotation;
use imgsafe_vision::encode_image;
use tracing::debug;
use tracing::info;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub file_id: String,
    pub should_mark_sensitive: bool,
    pub scores: SafeSearchAnnotation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    /// Classified. `file` carries the fresh detail fetched for it.
    Judged {
        file: FileCandidate,
        verdict: Verdict,
    },
    /// Handled without a classification call; the cursor may move past it.
    Skipped { reason: SkipReason },
    /// The monthly budget is spent. Nothing was done for this file.
    QuotaExhausted { resume_at: DateTime<Local> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    FileDeleted,
    ImageMissing,
    NoUrl,
    AlreadySensitive,
}

/// `true` when the adult or violence likelihood reaches `threshold`.
pub fn should_mark_sensitive(scores: &SafeSearchAnnotation, threshold: i32) -> bool {
    scores.adult.level() >= threshold || scores.violence.level() >= threshold
}

pub struct Evaluator<'a, H: ?Sized, C: ?Sized> {
    hosting: &'a H,
    classifier: &'a C,
    governor: QuotaGovernor,
    threshold: i32,
}

impl<'a, H, C> Evaluator<'a, H, C>
where
    H: HostingService + ?Sized,
    C: Classifier + ?Sized,
{
    pub fn new(hosting: &'a H, classifier: &'a C, governor: QuotaGovernor, threshold: i32) -> Self {
        Self {
            hosting,
            classifier,
            governor,
            threshold,
        }
    }

    /// Spends at most one classification request on `candidate`.
    ///
    /// The quota is reserved before any remote work and committed (and
    /// persisted) immediately before the classifier is called. A file or
    /// image that has disappeared is skipped without touching the quota.
    pub async fn evaluate(
        &self,
        candidate: &FileCandidate,
        state: &mut PersistedState,
        store: &StateStore,
        now: DateTime<Local>,
    ) -> Result<Evaluation, CycleError> {
        if let Reservation::Exhausted { resume_at } =
            self.governor.reserve(&mut state.quota, 1, now)
        {
            info!(
                spent = state.quota.spent,
                limit = self.governor.monthly_limit(),
                resume_at = %resume_at,
                "monthly classification quota exhausted"
            );
            return Ok(Evaluation::QuotaExhausted { resume_at });
        }

        let file = match self.hosting.file_detail(&candidate.id).await {
            Ok(file) => file,
            Err(ServiceError::NotFound) => {
                warn!(file_id = %candidate.id, "file was deleted before it could be checked");
                return Ok(skipped(SkipReason::FileDeleted));
            }
            Err(err) => return Err(err.into()),
        };
        if file.already_sensitive {
            debug!(file_id = %file.id, "file was flagged in the meantime");
            return Ok(skipped(SkipReason::AlreadySensitive));
        }
        let Some(url) = file.download_url.as_deref() else {
            warn!(file_id = %file.id, "file has no downloadable url");
            return Ok(skipped(SkipReason::NoUrl));
        };

        let image = match self.hosting.download(url).await {
            Ok(image) => image,
            Err(ServiceError::NotFound) => {
                warn!(file_id = %file.id, "image is gone, skipping");
                return Ok(skipped(SkipReason::ImageMissing));
            }
            Err(err) => return Err(err.into()),
        };
        let content = encode_image(&image);

        self.governor.commit(&mut state.quota, 1);
        store.save(state)?;
        debug!(
            file_id = %file.id,
            remaining = self.governor.remaining(&state.quota),
            "classifying image"
        );
        let scores = self.classifier.classify(&content).await;

        let should_mark_sensitive = should_mark_sensitive(&scores, self.threshold);
        debug!(
            file_id = %file.id,
            %scores,
            should_mark_sensitive,
            "classified image"
        );
        let verdict = Verdict {
            file_id: file.id.clone(),
            should_mark_sensitive,
            scores,
        };
        Ok(Evaluation::Judged { file, verdict })
    }
}

fn skipped(reason: SkipReason) -> Evaluation {
    Evaluation::Skipped { reason }
}
