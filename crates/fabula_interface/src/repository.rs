//! Persistence repository traits.
//!
//! Implementations are expected to be cheap to clone behind `Arc` and safe
//! to call from multiple worker tasks; the Postgres implementations hold a
//! connection pool internally.

use crate::JobRecord;
use fabula_core::{
    ActualCost, ChapterSnapshot, CharacterSheet, CreditKind, CreditModifiers, GuidePart, JobSpec,
    LocationSheet, PricingConfig, StorySnapshot, SummaryEntry,
};
use fabula_error::FabulaResult;

/// Audit log of generation jobs.
///
/// Settlement methods are transactional: `settle_success` debits the user
/// and marks the row succeeded as one unit, so a crash between the two
/// cannot leave a settled job with no charge or a charge with no record.
pub trait GenerationJobRepository: Send + Sync {
    /// Record a freshly dispatched job with status pending.
    ///
    /// Called before the job is enqueued, so a worker can never observe a
    /// spec whose row does not exist yet.
    fn insert_pending(&self, spec: &JobSpec) -> FabulaResult<()>;

    /// Debit the reconciled cost and mark the job succeeded, atomically.
    ///
    /// The debit is unconditional: a balance already at or below zero
    /// still moves down. Overdraft is contained by the dispatch-time
    /// guard, not here. Only a pending job settles; redelivery of an
    /// already-terminal job is a no-op so the debit can never repeat.
    fn settle_success(
        &self,
        task_id: &str,
        user_id: i32,
        credit_kind: CreditKind,
        actual: &ActualCost,
    ) -> FabulaResult<()>;

    /// Mark the job failed with a description. No credits move, and a job
    /// already in a terminal state keeps its outcome.
    fn mark_failed(&self, task_id: &str, message: &str) -> FabulaResult<()>;

    /// The job most recently dispatched by this user, if any.
    fn latest_for_user(&self, user_id: i32) -> FabulaResult<Option<JobRecord>>;

    /// Look up a job by its task id.
    fn by_task_id(&self, task_id: &str) -> FabulaResult<Option<JobRecord>>;

    /// This user's jobs, most recent first.
    fn jobs_for_user(&self, user_id: i32, limit: i64) -> FabulaResult<Vec<JobRecord>>;
}

/// Per-user credit balances, one independent pool per [`CreditKind`].
pub trait CreditLedger: Send + Sync {
    /// Current balance for a user in one credit pool.
    fn available(&self, user_id: i32, kind: CreditKind) -> FabulaResult<i64>;

    /// Whether the user can cover `amount` from the pool right now.
    fn can_afford(&self, user_id: i32, kind: CreditKind, amount: i64) -> FabulaResult<bool>;

    /// Add credits to a pool, returning the new balance.
    fn credit(&self, user_id: i32, kind: CreditKind, amount: i64) -> FabulaResult<i64>;
}

/// Story content reads and the per-kind transactional writes.
///
/// Each `replace_*`/`apply_*` method is all-or-nothing: a failure partway
/// through leaves the previous content untouched.
pub trait StoryStore: Send + Sync {
    /// Load a story snapshot, or None when the story does not exist or is
    /// not owned by `user_id`.
    fn load_story(&self, story_id: i32, user_id: i32) -> FabulaResult<Option<StorySnapshot>>;

    /// Replace all characters and locations for a story.
    fn replace_meta(
        &self,
        story_id: i32,
        characters: &[CharacterSheet],
        locations: &[LocationSheet],
    ) -> FabulaResult<()>;

    /// Replace all story arcs for a story.
    fn replace_arcs(&self, story_id: i32, arcs: &[String]) -> FabulaResult<()>;

    /// Replace the full chapter guide for a story.
    fn replace_guide(&self, story_id: i32, parts: &[GuidePart]) -> FabulaResult<()>;

    /// Apply generated titles and summaries to chapters positionally,
    /// creating chapter rows where the story has fewer than the entries.
    fn apply_summaries(&self, story_id: i32, entries: &[SummaryEntry])
    -> FabulaResult<Vec<ChapterSnapshot>>;

    /// Store the generated prose for one chapter.
    fn set_chapter_content(&self, chapter_id: i32, content: &str) -> FabulaResult<()>;

    /// Record the cover image key and the prompt that produced it.
    fn set_cover_image(&self, story_id: i32, key: &str, prompt: &str) -> FabulaResult<()>;

    /// Record a chapter image key and the prompt that produced it.
    fn set_chapter_image(&self, chapter_id: i32, key: &str, prompt: &str) -> FabulaResult<()>;
}

/// Pricing configuration and credit modifiers, read fresh per operation.
///
/// The dispatcher and worker each read at the moment they estimate, so an
/// admin price change applies to the next estimate without a restart.
pub trait PricingStore: Send + Sync {
    /// The active pricing configuration.
    fn pricing(&self) -> FabulaResult<PricingConfig>;

    /// The active credit modifiers.
    fn modifiers(&self) -> FabulaResult<CreditModifiers>;
}
