//! Trait seams for model access, media storage, queueing, locking, and
//! realtime notification.

use crate::GenerationEvent;
use async_trait::async_trait;
use fabula_core::{JobSpec, ModelTier};
use fabula_error::FabulaResult;

/// A completed text generation.
#[derive(Debug, Clone, PartialEq, Eq, derive_getters::Getters)]
pub struct Completion {
    /// The model's text output
    text: String,
}

impl Completion {
    /// Wrap model output text.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Access to the text and image models.
#[async_trait]
pub trait ModelDriver: Send + Sync {
    /// Generate text from a prompt on the given tier.
    async fn complete(&self, prompt: &str, tier: ModelTier) -> FabulaResult<Completion>;

    /// Generate an image from a prompt, returning the raw bytes.
    async fn generate_image(&self, prompt: &str) -> FabulaResult<Vec<u8>>;

    /// The model identifier the given tier resolves to. Used for token
    /// counting and recorded on the job row at settlement.
    fn model_id(&self, tier: ModelTier) -> &str;

    /// The image model identifier, recorded on image job rows.
    fn image_model_id(&self) -> &str;
}

/// Object storage for generated images.
#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Store bytes under a key, overwriting any existing object.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> FabulaResult<()>;

    /// A URL the owner can fetch the object from.
    async fn url(&self, key: &str) -> FabulaResult<String>;

    /// Delete every object whose key starts with `prefix`. Used when a
    /// story or chapter is removed.
    async fn delete_prefix(&self, prefix: &str) -> FabulaResult<()>;
}

/// Hands dispatched jobs to the worker pool.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Enqueue a job for asynchronous execution, returning its task id.
    ///
    /// The job's pending row already exists when this is called.
    async fn enqueue(&self, spec: JobSpec) -> FabulaResult<String>;
}

/// Per-user mutual exclusion for conflicting text generations.
///
/// Acquisition is set-if-absent with a TTL so a crashed worker cannot
/// wedge a user forever.
pub trait GenerationLock: Send + Sync {
    /// Try to take the lock for a user. Returns false when an unexpired
    /// lock is already held.
    fn acquire(&self, user_id: i32) -> bool;

    /// Release the lock for a user. Releasing an unheld lock is a no-op.
    fn release(&self, user_id: i32);
}

/// Best-effort realtime delivery of [`GenerationEvent`]s to the owner.
pub trait Notifier: Send + Sync {
    /// Emit an event to the given user. Implementations swallow delivery
    /// failures; the job row remains the durable record.
    fn emit(&self, user_id: i32, event: GenerationEvent);
}
