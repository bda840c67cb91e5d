//! Synchronous job dispatch.
//!
//! The dispatcher is the gate between a user's request and the worker
//! pool. Every dispatch walks the same contract: overdraft guard, story
//! lookup, lock acquisition for conflicting kinds, cost prediction,
//! affordability check, durable pending row, enqueue. The pending row is
//! written before the enqueue so a worker can never pick up a job whose
//! audit record does not exist.

use crate::{CostEstimator, prompts};
use derive_getters::Getters;
use fabula_core::{CreditKind, GenerationKind, JobSpec, PredictedCost, StorySnapshot};
use fabula_error::{DispatchError, DispatchErrorKind, FabulaError, FabulaResult};
use fabula_interface::{
    CreditLedger, GenerationJobRepository, GenerationLock, ModelDriver, PricingStore, StoryStore,
    TaskQueue,
};
use serde::Serialize;
use std::sync::Arc;

/// Response to a successful dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Getters)]
pub struct DispatchReceipt {
    /// Task id of the queued job
    task_id: String,
    /// Always `queued`; terminal status arrives over the event stream
    status: String,
    /// Predicted credit cost recorded on the job row
    predicted_cost: i64,
}

impl DispatchReceipt {
    fn queued(task_id: String, predicted_cost: i64) -> Self {
        Self {
            task_id,
            status: "queued".to_string(),
            predicted_cost,
        }
    }
}

/// Validates, prices, records, and enqueues generation jobs.
pub struct JobDispatcher {
    jobs: Arc<dyn GenerationJobRepository>,
    ledger: Arc<dyn CreditLedger>,
    stories: Arc<dyn StoryStore>,
    pricing: Arc<dyn PricingStore>,
    queue: Arc<dyn TaskQueue>,
    lock: Arc<dyn GenerationLock>,
    driver: Arc<dyn ModelDriver>,
}

impl JobDispatcher {
    /// Create a dispatcher over the given backends.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        jobs: Arc<dyn GenerationJobRepository>,
        ledger: Arc<dyn CreditLedger>,
        stories: Arc<dyn StoryStore>,
        pricing: Arc<dyn PricingStore>,
        queue: Arc<dyn TaskQueue>,
        lock: Arc<dyn GenerationLock>,
        driver: Arc<dyn ModelDriver>,
    ) -> Self {
        Self {
            jobs,
            ledger,
            stories,
            pricing,
            queue,
            lock,
            driver,
        }
    }

    fn estimator(&self) -> FabulaResult<CostEstimator> {
        Ok(CostEstimator::new(
            self.pricing.pricing()?,
            self.pricing.modifiers()?,
        ))
    }

    /// A user whose most recent job matches the requested kind and whose
    /// balance in that kind's pool is non-positive gets one refusal
    /// instead of a deeper overdraft. The two image kinds share a pool and
    /// guard each other.
    fn guard_overdraft(&self, user_id: i32, kind: GenerationKind) -> FabulaResult<()> {
        let Some(latest) = self.jobs.latest_for_user(user_id)? else {
            return Ok(());
        };
        let same_category = latest.kind == kind
            || (latest.kind.credit_kind() == CreditKind::Image
                && kind.credit_kind() == CreditKind::Image);
        if same_category && self.ledger.available(user_id, kind.credit_kind())? <= 0 {
            return Err(DispatchError::new(DispatchErrorKind::OverdraftBlocked).into());
        }
        Ok(())
    }

    fn load_story(&self, story_id: i32, user_id: i32) -> FabulaResult<StorySnapshot> {
        self.stories
            .load_story(story_id, user_id)?
            .ok_or_else(|| DispatchError::new(DispatchErrorKind::StoryNotFound).into())
    }

    fn render_prompt(
        &self,
        kind: GenerationKind,
        story: &StorySnapshot,
        chapter_number: Option<i32>,
    ) -> FabulaResult<String> {
        match kind {
            GenerationKind::Metadata => Ok(prompts::metadata_prompt(story)),
            GenerationKind::StoryArcs => Ok(prompts::arcs_prompt(story)),
            GenerationKind::ChapterGuide => Ok(prompts::guide_prompt(story)),
            GenerationKind::ChapterSummaries => Ok(prompts::summaries_prompt(story)),
            GenerationKind::ChapterContent => {
                let number = chapter_number
                    .ok_or_else(|| DispatchError::new(DispatchErrorKind::ChapterNotFound))?;
                prompts::chapter_prompt(story, number)
            }
            GenerationKind::CoverImage | GenerationKind::ChapterImage => {
                // Image prompts are user-supplied; nothing to render here.
                Err(DispatchError::new(DispatchErrorKind::UnsupportedKind(kind.to_string())).into())
            }
        }
    }

    fn predict_for(
        &self,
        kind: GenerationKind,
        story: &StorySnapshot,
        prompt: &str,
    ) -> FabulaResult<PredictedCost> {
        let tier = kind
            .tier()
            .ok_or_else(|| DispatchError::new(DispatchErrorKind::UnsupportedKind(kind.to_string())))?;
        let model = self.driver.model_id(tier);
        self.estimator()?
            .predict(kind, prompt, model, i64::from(*story.chapter_count()))
    }

    /// Predict the cost of a text generation without dispatching it.
    pub fn predict(
        &self,
        user_id: i32,
        story_id: i32,
        kind: GenerationKind,
        chapter_number: Option<i32>,
    ) -> FabulaResult<PredictedCost> {
        let story = self.load_story(story_id, user_id)?;
        let prompt = self.render_prompt(kind, &story, chapter_number)?;
        self.predict_for(kind, &story, &prompt)
    }

    /// Predict the flat credit cost of one image generation.
    pub fn predict_image_cost(&self) -> FabulaResult<i64> {
        self.estimator()?.image_cost()
    }

    async fn record_and_enqueue(&self, spec: JobSpec) -> FabulaResult<DispatchReceipt> {
        let predicted_cost = *spec.predicted_cost();
        self.jobs.insert_pending(&spec)?;
        match self.queue.enqueue(spec).await {
            Ok(task_id) => Ok(DispatchReceipt::queued(task_id, predicted_cost)),
            Err(err) => Err(err),
        }
    }

    /// Run the dispatch contract for one text generation kind.
    #[tracing::instrument(skip(self), fields(kind = %kind))]
    async fn dispatch_text(
        &self,
        user_id: i32,
        story_id: i32,
        kind: GenerationKind,
        chapter_number: Option<i32>,
    ) -> FabulaResult<DispatchReceipt> {
        self.guard_overdraft(user_id, kind)?;
        let story = self.load_story(story_id, user_id)?;

        let holds_lock = kind.requires_lock();
        if holds_lock && !self.lock.acquire(user_id) {
            return Err(DispatchError::new(DispatchErrorKind::GenerationInProgress).into());
        }

        let result = self
            .dispatch_text_locked(user_id, story_id, kind, chapter_number, &story, holds_lock)
            .await;
        // The worker owns the release once the job is queued; a rejection
        // here means no job exists to do it.
        if holds_lock && result.is_err() {
            self.lock.release(user_id);
        }
        result
    }

    async fn dispatch_text_locked(
        &self,
        user_id: i32,
        story_id: i32,
        kind: GenerationKind,
        chapter_number: Option<i32>,
        story: &StorySnapshot,
        holds_lock: bool,
    ) -> FabulaResult<DispatchReceipt> {
        let prompt = self.render_prompt(kind, story, chapter_number)?;
        let predicted = self.predict_for(kind, story, &prompt)?;
        let required = *predicted.total_predicted_credit_cost();
        let available = self.ledger.available(user_id, kind.credit_kind())?;
        if available < required {
            return Err(DispatchError::new(DispatchErrorKind::InsufficientCredits {
                required,
                available,
            })
            .into());
        }

        let task_id = uuid::Uuid::new_v4().to_string();
        let spec = match kind {
            GenerationKind::ChapterContent => {
                let number = chapter_number
                    .ok_or_else(|| DispatchError::new(DispatchErrorKind::ChapterNotFound))?;
                JobSpec::chapter(
                    task_id,
                    user_id,
                    story_id,
                    number,
                    prompt,
                    *predicted.input_tokens(),
                    required,
                    holds_lock,
                )
            }
            _ => JobSpec::text(
                task_id,
                user_id,
                kind,
                story_id,
                prompt,
                *predicted.input_tokens(),
                required,
                holds_lock,
            ),
        };
        self.record_and_enqueue(spec).await
    }

    /// Dispatch character and location generation.
    pub async fn dispatch_metadata(
        &self,
        user_id: i32,
        story_id: i32,
    ) -> FabulaResult<DispatchReceipt> {
        self.dispatch_text(user_id, story_id, GenerationKind::Metadata, None)
            .await
    }

    /// Dispatch story arc generation.
    pub async fn dispatch_arcs(&self, user_id: i32, story_id: i32) -> FabulaResult<DispatchReceipt> {
        self.dispatch_text(user_id, story_id, GenerationKind::StoryArcs, None)
            .await
    }

    /// Dispatch chapter guide generation.
    pub async fn dispatch_guide(
        &self,
        user_id: i32,
        story_id: i32,
    ) -> FabulaResult<DispatchReceipt> {
        self.dispatch_text(user_id, story_id, GenerationKind::ChapterGuide, None)
            .await
    }

    /// Dispatch chapter title and summary generation.
    pub async fn dispatch_summaries(
        &self,
        user_id: i32,
        story_id: i32,
    ) -> FabulaResult<DispatchReceipt> {
        self.dispatch_text(user_id, story_id, GenerationKind::ChapterSummaries, None)
            .await
    }

    /// Dispatch prose generation for one chapter.
    pub async fn dispatch_chapter(
        &self,
        user_id: i32,
        story_id: i32,
        chapter_number: i32,
    ) -> FabulaResult<DispatchReceipt> {
        self.dispatch_text(
            user_id,
            story_id,
            GenerationKind::ChapterContent,
            Some(chapter_number),
        )
        .await
    }

    /// Dispatch prose generation for every chapter of a story.
    ///
    /// The lock is held only while the batch is validated and enqueued:
    /// it serves as the conflict check against other text generations,
    /// then the per-chapter jobs run unlocked and independently.
    /// Affordability is checked against the whole batch up front.
    #[tracing::instrument(skip(self))]
    pub async fn dispatch_all_chapters(
        &self,
        user_id: i32,
        story_id: i32,
    ) -> FabulaResult<Vec<DispatchReceipt>> {
        self.guard_overdraft(user_id, GenerationKind::ChapterContent)?;
        let story = self.load_story(story_id, user_id)?;
        if story.chapters().is_empty() {
            return Err(DispatchError::new(DispatchErrorKind::ChapterNotFound).into());
        }

        if !self.lock.acquire(user_id) {
            return Err(DispatchError::new(DispatchErrorKind::GenerationInProgress).into());
        }
        let result = self.dispatch_all_chapters_locked(user_id, story_id, &story).await;
        self.lock.release(user_id);
        result
    }

    async fn dispatch_all_chapters_locked(
        &self,
        user_id: i32,
        story_id: i32,
        story: &StorySnapshot,
    ) -> FabulaResult<Vec<DispatchReceipt>> {
        let mut batch = Vec::with_capacity(story.chapters().len());
        let mut required = 0;
        for chapter in story.chapters() {
            let number = *chapter.number();
            let prompt = prompts::chapter_prompt(story, number)?;
            let predicted = self.predict_for(GenerationKind::ChapterContent, story, &prompt)?;
            required += *predicted.total_predicted_credit_cost();
            batch.push((number, prompt, predicted));
        }

        let available = self.ledger.available(user_id, CreditKind::Text)?;
        if available < required {
            return Err(DispatchError::new(DispatchErrorKind::InsufficientCredits {
                required,
                available,
            })
            .into());
        }

        let mut receipts = Vec::with_capacity(batch.len());
        for (number, prompt, predicted) in batch {
            let spec = JobSpec::chapter(
                uuid::Uuid::new_v4().to_string(),
                user_id,
                story_id,
                number,
                prompt,
                *predicted.input_tokens(),
                *predicted.total_predicted_credit_cost(),
                false,
            );
            receipts.push(self.record_and_enqueue(spec).await?);
        }
        Ok(receipts)
    }

    /// Dispatch cover image generation with a user-supplied prompt.
    #[tracing::instrument(skip(self, prompt))]
    pub async fn dispatch_cover_image(
        &self,
        user_id: i32,
        story_id: i32,
        prompt: &str,
    ) -> FabulaResult<DispatchReceipt> {
        self.guard_overdraft(user_id, GenerationKind::CoverImage)?;
        let story = self.load_story(story_id, user_id)?;
        let predicted_cost = self.affordable_image_cost(user_id).await?;
        let spec = JobSpec::image(
            uuid::Uuid::new_v4().to_string(),
            user_id,
            GenerationKind::CoverImage,
            *story.id(),
            None,
            prompts::cover_image_key(*story.id()),
            prompt,
            predicted_cost,
        );
        self.record_and_enqueue(spec).await
    }

    /// Dispatch chapter image generation with a user-supplied prompt.
    #[tracing::instrument(skip(self, prompt))]
    pub async fn dispatch_chapter_image(
        &self,
        user_id: i32,
        story_id: i32,
        chapter_id: i32,
        prompt: &str,
    ) -> FabulaResult<DispatchReceipt> {
        self.guard_overdraft(user_id, GenerationKind::ChapterImage)?;
        let story = self.load_story(story_id, user_id)?;
        if !story.chapters().iter().any(|c| *c.id() == chapter_id) {
            return Err(DispatchError::new(DispatchErrorKind::ChapterNotFound).into());
        }
        let predicted_cost = self.affordable_image_cost(user_id).await?;
        let spec = JobSpec::image(
            uuid::Uuid::new_v4().to_string(),
            user_id,
            GenerationKind::ChapterImage,
            story_id,
            Some(chapter_id),
            prompts::chapter_image_key(story_id, chapter_id),
            prompt,
            predicted_cost,
        );
        self.record_and_enqueue(spec).await
    }

    async fn affordable_image_cost(&self, user_id: i32) -> FabulaResult<i64> {
        let required = self.predict_image_cost()?;
        let available = self.ledger.available(user_id, CreditKind::Image)?;
        if available < required {
            return Err(DispatchError::new(DispatchErrorKind::InsufficientCredits {
                required,
                available,
            })
            .into());
        }
        Ok(required)
    }
}

/// Whether an error is one of the synchronous dispatch rejections.
pub fn dispatch_rejection(err: &FabulaError) -> Option<&DispatchErrorKind> {
    match err.kind() {
        fabula_error::FabulaErrorKind::Dispatch(e) => Some(&e.kind),
        _ => None,
    }
}
