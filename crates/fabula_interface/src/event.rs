//! Realtime events emitted to the owning user as jobs finish.

use fabula_core::GenerationKind;
use serde::{Deserialize, Serialize};

/// A realtime notification addressed to the job's owner.
///
/// Every dispatched job produces exactly one terminal event: one of the
/// success variants, or `GenerationFailed`. Delivery is best-effort; the
/// database row is the durable record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GenerationEvent {
    /// Characters and locations were regenerated
    MetaGenerated {
        /// Story the metadata belongs to
        story_id: i32,
    },
    /// Story arcs were regenerated
    ArcsGenerated {
        /// Story the arcs belong to
        story_id: i32,
    },
    /// The chapter guide was regenerated
    GuideGenerated {
        /// Story the guide belongs to
        story_id: i32,
    },
    /// Chapter titles and summaries were regenerated
    SummariesGenerated {
        /// Story the summaries belong to
        story_id: i32,
    },
    /// A chapter's prose was generated
    ChapterGenerated {
        /// Story the chapter belongs to
        story_id: i32,
        /// Chapter number, 1-based
        chapter_number: i32,
    },
    /// A cover or chapter image was generated and stored
    ImageGenerated {
        /// Story the image belongs to
        story_id: i32,
        /// Which image kind finished
        kind: GenerationKind,
        /// Presigned URL for immediate display
        url: String,
    },
    /// A job failed; no content was persisted and no credits were spent
    GenerationFailed {
        /// Story the job targeted
        story_id: i32,
        /// Which kind failed
        kind: GenerationKind,
        /// Task id of the failed job
        task_id: String,
        /// Human-readable failure description
        message: String,
    },
}

impl GenerationEvent {
    /// The wire name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::MetaGenerated { .. } => "meta_generated",
            Self::ArcsGenerated { .. } => "arcs_generated",
            Self::GuideGenerated { .. } => "guide_generated",
            Self::SummariesGenerated { .. } => "summaries_generated",
            Self::ChapterGenerated { .. } => "chapter_generated",
            Self::ImageGenerated { .. } => "image_generated",
            Self::GenerationFailed { .. } => "generation_failed",
        }
    }

    /// The story this event concerns.
    pub fn story_id(&self) -> i32 {
        match self {
            Self::MetaGenerated { story_id }
            | Self::ArcsGenerated { story_id }
            | Self::GuideGenerated { story_id }
            | Self::SummariesGenerated { story_id }
            | Self::ChapterGenerated { story_id, .. }
            | Self::ImageGenerated { story_id, .. }
            | Self::GenerationFailed { story_id, .. } => *story_id,
        }
    }
}
