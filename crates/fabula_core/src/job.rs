//! Job lifecycle types and the serializable queue message.

use crate::GenerationKind;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a generation job.
///
/// Transitions are monotonic: `Pending` moves to exactly one of the
/// terminal states and never back.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    /// Dispatched, not yet executed
    Pending,
    /// Executed and reconciled
    Succeeded,
    /// Executed and failed; terminal, re-dispatch is a brand-new job
    Failed,
}

impl JobStatus {
    /// Whether this status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Serializable descriptor for one unit of generation work.
///
/// Carries everything the worker needs to run without re-deriving state:
/// the prompt is rendered at dispatch time and travels with the job, so a
/// story edited between dispatch and execution cannot change what the
/// model sees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct JobSpec {
    /// Task identifier assigned at dispatch (uuid)
    task_id: String,
    /// Owning user
    user_id: i32,
    /// What to generate
    kind: GenerationKind,
    /// Target story
    story_id: i32,
    /// Target chapter number, for chapter content jobs (1-based)
    chapter_number: Option<i32>,
    /// Target chapter id, for chapter image jobs
    chapter_id: Option<i32>,
    /// Media storage key, for image jobs
    image_key: Option<String>,
    /// Fully rendered prompt text
    prompt: String,
    /// Input token count measured at prediction time
    input_tokens: i64,
    /// Predicted credit cost recorded on the job row
    predicted_cost: i64,
    /// Whether the dispatcher acquired the generation lock for this job;
    /// the worker releases it exactly when set
    holds_lock: bool,
}

/// Builder-free constructor set for [`JobSpec`]; each dispatch path
/// populates only the fields its kind uses.
impl JobSpec {
    /// Spec for a text generation job (metadata, arcs, guide, summaries).
    pub fn text(
        task_id: impl Into<String>,
        user_id: i32,
        kind: GenerationKind,
        story_id: i32,
        prompt: impl Into<String>,
        input_tokens: i64,
        predicted_cost: i64,
        holds_lock: bool,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            user_id,
            kind,
            story_id,
            chapter_number: None,
            chapter_id: None,
            image_key: None,
            prompt: prompt.into(),
            input_tokens,
            predicted_cost,
            holds_lock,
        }
    }

    /// Spec for a single-chapter content job.
    #[allow(clippy::too_many_arguments)]
    pub fn chapter(
        task_id: impl Into<String>,
        user_id: i32,
        story_id: i32,
        chapter_number: i32,
        prompt: impl Into<String>,
        input_tokens: i64,
        predicted_cost: i64,
        holds_lock: bool,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            user_id,
            kind: GenerationKind::ChapterContent,
            story_id,
            chapter_number: Some(chapter_number),
            chapter_id: None,
            image_key: None,
            prompt: prompt.into(),
            input_tokens,
            predicted_cost,
            holds_lock,
        }
    }

    /// Spec for an image job. `chapter_id` is None for cover images.
    pub fn image(
        task_id: impl Into<String>,
        user_id: i32,
        kind: GenerationKind,
        story_id: i32,
        chapter_id: Option<i32>,
        image_key: impl Into<String>,
        prompt: impl Into<String>,
        predicted_cost: i64,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            user_id,
            kind,
            story_id,
            chapter_number: None,
            chapter_id,
            image_key: Some(image_key.into()),
            prompt: prompt.into(),
            input_tokens: 0,
            predicted_cost,
            holds_lock: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_terminality() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(JobStatus::Succeeded.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_spec_serde_round_trip() {
        let spec = JobSpec::chapter("t-1", 7, 3, 2, "write chapter two", 1200, 45, true);
        let json = serde_json::to_string(&spec).unwrap();
        let back: JobSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spec);
    }

    #[test]
    fn test_image_spec_never_holds_lock() {
        let spec = JobSpec::image(
            "t-2",
            7,
            GenerationKind::CoverImage,
            3,
            None,
            "stories/3/cover.jpg",
            "a lighthouse at dusk",
            10,
        );
        assert!(!spec.holds_lock());
    }
}
