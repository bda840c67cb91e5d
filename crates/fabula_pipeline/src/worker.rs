//! Asynchronous job execution.
//!
//! The worker consumes [`JobSpec`]s from the queue and drives each one to
//! a terminal state: model call, parse, transactional persist, cost
//! reconciliation, atomic settlement, realtime event. Any failure marks
//! the job failed without persisting content or moving credits. The
//! generation lock, when the job holds one, is released on every path.

use crate::{CostEstimator, parse};
use fabula_core::{ActualCost, CreditKind, GenerationKind, JobSpec};
use fabula_error::{FabulaResult, WorkerError, WorkerErrorKind};
use fabula_interface::{
    GenerationEvent, GenerationJobRepository, GenerationLock, MediaStorage, ModelDriver, Notifier,
    PricingStore, StoryStore,
};
use std::sync::Arc;

/// Executes generation jobs to completion.
pub struct JobWorker {
    driver: Arc<dyn ModelDriver>,
    storage: Arc<dyn MediaStorage>,
    jobs: Arc<dyn GenerationJobRepository>,
    stories: Arc<dyn StoryStore>,
    pricing: Arc<dyn PricingStore>,
    lock: Arc<dyn GenerationLock>,
    notifier: Arc<dyn Notifier>,
}

impl JobWorker {
    /// Create a worker over the given backends.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        driver: Arc<dyn ModelDriver>,
        storage: Arc<dyn MediaStorage>,
        jobs: Arc<dyn GenerationJobRepository>,
        stories: Arc<dyn StoryStore>,
        pricing: Arc<dyn PricingStore>,
        lock: Arc<dyn GenerationLock>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            driver,
            storage,
            jobs,
            stories,
            pricing,
            lock,
            notifier,
        }
    }

    /// Run one job to a terminal state.
    ///
    /// Never returns an error: failures are recorded on the job row and
    /// emitted as a failure event. The lock release in the tail runs on
    /// success and failure alike, exactly when this job acquired it.
    #[tracing::instrument(skip(self, spec), fields(task_id = %spec.task_id(), kind = %spec.kind()))]
    pub async fn execute(&self, spec: JobSpec) {
        let user_id = *spec.user_id();
        match self.run(&spec).await {
            Ok(event) => {
                tracing::info!("job succeeded");
                self.notifier.emit(user_id, event);
            }
            Err(err) => {
                let message = err.to_string();
                tracing::warn!(error = %message, "job failed");
                if let Err(mark_err) = self.jobs.mark_failed(spec.task_id(), &message) {
                    tracing::error!(error = %mark_err, "failed to record job failure");
                }
                self.notifier.emit(
                    user_id,
                    GenerationEvent::GenerationFailed {
                        story_id: *spec.story_id(),
                        kind: *spec.kind(),
                        task_id: spec.task_id().clone(),
                        message,
                    },
                );
            }
        }
        if *spec.holds_lock() {
            self.lock.release(user_id);
        }
    }

    async fn run(&self, spec: &JobSpec) -> FabulaResult<GenerationEvent> {
        match spec.kind() {
            GenerationKind::CoverImage | GenerationKind::ChapterImage => {
                self.run_image(spec).await
            }
            _ => self.run_text(spec).await,
        }
    }

    /// Fresh estimator per job so reconciliation uses the pricing active
    /// at settlement time.
    fn estimator(&self) -> FabulaResult<CostEstimator> {
        Ok(CostEstimator::new(
            self.pricing.pricing()?,
            self.pricing.modifiers()?,
        ))
    }

    async fn run_text(&self, spec: &JobSpec) -> FabulaResult<GenerationEvent> {
        let kind = *spec.kind();
        let tier = kind.tier().ok_or_else(|| {
            WorkerError::new(WorkerErrorKind::TargetMissing(format!(
                "model tier for {kind}"
            )))
        })?;
        let model = self.driver.model_id(tier).to_string();
        let completion = self.driver.complete(spec.prompt(), tier).await?;
        let output = completion.text();

        // Parse and persist before any credits move; a failure here fails
        // the job with the balance untouched.
        let event = match kind {
            GenerationKind::Metadata => {
                let (characters, locations) = parse::parse_metadata(output)?;
                self.stories
                    .replace_meta(*spec.story_id(), &characters, &locations)?;
                GenerationEvent::MetaGenerated {
                    story_id: *spec.story_id(),
                }
            }
            GenerationKind::StoryArcs => {
                let arcs = parse::parse_arcs(output)?;
                self.stories.replace_arcs(*spec.story_id(), &arcs)?;
                GenerationEvent::ArcsGenerated {
                    story_id: *spec.story_id(),
                }
            }
            GenerationKind::ChapterGuide => {
                let parts = parse::parse_guide(output)?;
                self.stories.replace_guide(*spec.story_id(), &parts)?;
                GenerationEvent::GuideGenerated {
                    story_id: *spec.story_id(),
                }
            }
            GenerationKind::ChapterSummaries => {
                let entries = parse::parse_summaries(output)?;
                self.stories.apply_summaries(*spec.story_id(), &entries)?;
                GenerationEvent::SummariesGenerated {
                    story_id: *spec.story_id(),
                }
            }
            GenerationKind::ChapterContent => {
                let chapter_number = spec.chapter_number().ok_or_else(|| {
                    WorkerError::new(WorkerErrorKind::TargetMissing(
                        "chapter number".to_string(),
                    ))
                })?;
                let story = self
                    .stories
                    .load_story(*spec.story_id(), *spec.user_id())?
                    .ok_or_else(|| {
                        WorkerError::new(WorkerErrorKind::TargetMissing("Story".to_string()))
                    })?;
                let chapter = story.chapter_by_number(chapter_number).ok_or_else(|| {
                    WorkerError::new(WorkerErrorKind::TargetMissing("Chapter".to_string()))
                })?;
                self.stories.set_chapter_content(*chapter.id(), output)?;
                GenerationEvent::ChapterGenerated {
                    story_id: *spec.story_id(),
                    chapter_number,
                }
            }
            GenerationKind::CoverImage | GenerationKind::ChapterImage => unreachable!(),
        };

        let actual = self
            .estimator()?
            .reconcile(kind, *spec.input_tokens(), output, &model)?;
        self.jobs.settle_success(
            spec.task_id(),
            *spec.user_id(),
            kind.credit_kind(),
            &actual,
        )?;
        Ok(event)
    }

    async fn run_image(&self, spec: &JobSpec) -> FabulaResult<GenerationEvent> {
        let key = spec.image_key().as_deref().ok_or_else(|| {
            WorkerError::new(WorkerErrorKind::TargetMissing("image key".to_string()))
        })?;
        let bytes = self.driver.generate_image(spec.prompt()).await?;
        self.storage.put(key, bytes, "image/jpeg").await?;

        match spec.kind() {
            GenerationKind::CoverImage => {
                self.stories
                    .set_cover_image(*spec.story_id(), key, spec.prompt())?;
            }
            GenerationKind::ChapterImage => {
                let chapter_id = spec.chapter_id().ok_or_else(|| {
                    WorkerError::new(WorkerErrorKind::TargetMissing("chapter id".to_string()))
                })?;
                self.stories.set_chapter_image(chapter_id, key, spec.prompt())?;
            }
            _ => unreachable!(),
        }

        // Images settle at the predicted flat cost; there is no token
        // dimension to reconcile.
        let actual = ActualCost::flat(*spec.predicted_cost(), self.driver.image_model_id());
        self.jobs.settle_success(
            spec.task_id(),
            *spec.user_id(),
            CreditKind::Image,
            &actual,
        )?;

        let url = self.storage.url(key).await?;
        Ok(GenerationEvent::ImageGenerated {
            story_id: *spec.story_id(),
            kind: *spec.kind(),
            url,
        })
    }
}
