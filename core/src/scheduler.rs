use crate::action::ActionOutcome;
use crate::action::Executor;
use crate::config::Config;
use crate::error::CycleError;
use crate::evaluate::Evaluation;
use crate::evaluate::Evaluator;
use crate::feed::ChangeFeed;
use crate::quota::QuotaGovernor;
use crate::services::Classifier;
use crate::services::Clock;
use crate::services::HostingService;
use crate::services::Notifier;
use crate::state::PersistedState;
use crate::state::StateStore;
use chrono::DateTime;
use chrono::Local;
use chrono::Utc;
use imgsafe_async_utils::OrCancelExt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub threshold: i32,
    pub monthly_limit: u32,
    pub page_size: u32,
    pub min_image_size: u64,
    /// Pause after each classified file.
    pub request_interval: Duration,
    pub poll_period: Duration,
}

impl From<&Config> for EngineSettings {
    fn from(config: &Config) -> Self {
        Self {
            threshold: config.judging_score,
            monthly_limit: config.limit_per_month,
            page_size: config.page_size,
            min_image_size: config.checking_image_size_min,
            request_interval: config.request_interval,
            poll_period: config.poll_period,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleOutcome {
    /// Files that were classified.
    pub processed: usize,
    /// Files passed over without a classification call.
    pub skipped: usize,
    pub flagged: usize,
    /// Set when the cycle stopped early on the monthly quota.
    pub quota_resume_at: Option<DateTime<Local>>,
}

/// Everything one poll cycle needs.
pub struct Engine<H, C, N, K> {
    hosting: H,
    classifier: C,
    notifier: Option<N>,
    clock: K,
    settings: EngineSettings,
}

impl<H, C, N, K> Engine<H, C, N, K>
where
    H: HostingService,
    C: Classifier,
    N: Notifier,
    K: Clock,
{
    pub fn new(
        hosting: H,
        classifier: C,
        notifier: Option<N>,
        clock: K,
        settings: EngineSettings,
    ) -> Self {
        Self {
            hosting,
            classifier,
            notifier,
            clock,
            settings,
        }
    }

    /// Runs one walk-evaluate-act cycle from the state on disk.
    ///
    /// The cursor moves to a file only after that file has been fully
    /// handled, and every cursor move and quota commit is saved before the
    /// next remote call, so an aborted cycle loses at most the file in
    /// flight.
    pub async fn run_cycle(&self, store: &StateStore) -> Result<CycleOutcome, CycleError> {
        let mut state = store.load();
        let result = self.walk(&mut state, store).await;

        state.last_polled_at = Some(self.clock.now().with_timezone(&Utc));
        let saved = store.save(&state);
        let outcome = result?;
        saved?;
        Ok(outcome)
    }

    async fn walk(
        &self,
        state: &mut PersistedState,
        store: &StateStore,
    ) -> Result<CycleOutcome, CycleError> {
        let settings = &self.settings;
        let feed = ChangeFeed::new(&self.hosting, settings.page_size, settings.min_image_size);
        let evaluator = Evaluator::new(
            &self.hosting,
            &self.classifier,
            QuotaGovernor::new(settings.monthly_limit),
            settings.threshold,
        );
        let executor = Executor::new(&self.hosting, self.notifier.as_ref());

        let mut outcome = CycleOutcome::default();
        let mut cooldown = false;
        while let Some(batch) = feed.next_batch(state, store).await? {
            for candidate in &batch.candidates {
                if cooldown && !settings.request_interval.is_zero() {
                    tokio::time::sleep(settings.request_interval).await;
                }
                cooldown = false;

                match evaluator
                    .evaluate(candidate, state, store, self.clock.now())
                    .await?
                {
                    Evaluation::QuotaExhausted { resume_at } => {
                        outcome.quota_resume_at = Some(resume_at);
                        return Ok(outcome);
                    }
                    Evaluation::Skipped { reason } => {
                        debug!(file_id = %candidate.id, ?reason, "skipped file");
                        outcome.skipped += 1;
                    }
                    Evaluation::Judged { file, verdict } => {
                        outcome.processed += 1;
                        cooldown = true;
                        if executor.apply(&file, &verdict).await? == ActionOutcome::Flagged {
                            outcome.flagged += 1;
                        }
                    }
                }

                state.cursor = Some(candidate.id.clone());
                store.save(state)?;
            }

            if state.cursor.as_deref() != Some(batch.page_head.as_str()) {
                state.cursor = Some(batch.page_head);
                store.save(state)?;
            }
        }
        Ok(outcome)
    }

    /// Time to wait after a cycle before starting the next one.
    pub fn next_delay(&self, outcome: Option<&CycleOutcome>) -> Duration {
        let period = self.settings.poll_period;
        let Some(resume_at) = outcome.and_then(|o| o.quota_resume_at) else {
            return period;
        };
        let until_resume = (resume_at - self.clock.now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        period.max(until_resume)
    }
}

/// Drives [`Engine::run_cycle`] on the poll period. Cycles never overlap.
pub struct Scheduler<H, C, N, K> {
    engine: Engine<H, C, N, K>,
    store: StateStore,
}

impl<H, C, N, K> Scheduler<H, C, N, K>
where
    H: HostingService,
    C: Classifier,
    N: Notifier,
    K: Clock,
{
    pub fn new(engine: Engine<H, C, N, K>, store: StateStore) -> Self {
        Self { engine, store }
    }

    /// Runs a single cycle, abandoning it if `cancel` fires.
    pub async fn run_once(&self, cancel: &CancellationToken) -> Result<CycleOutcome, CycleError> {
        info!("starting poll cycle");
        let outcome = self
            .engine
            .run_cycle(&self.store)
            .or_cancel(cancel)
            .await
            .map_err(|_| CycleError::Cancelled)??;
        info!(
            processed = outcome.processed,
            skipped = outcome.skipped,
            flagged = outcome.flagged,
            "poll cycle finished"
        );
        Ok(outcome)
    }

    /// Polls until `cancel` fires. The first cycle starts immediately.
    pub async fn run(&self, cancel: CancellationToken) {
        loop {
            let delay = match self.run_once(&cancel).await {
                Ok(outcome) => self.engine.next_delay(Some(&outcome)),
                Err(CycleError::Cancelled) => break,
                Err(err) => {
                    error!("poll cycle failed: {err}");
                    self.engine.next_delay(None)
                }
            };
            debug!(delay_secs = delay.as_secs(), "waiting for next poll");
            if tokio::time::sleep(delay).or_cancel(&cancel).await.is_err() {
                break;
            }
        }
        info!("poll loop stopped");
    }
}
