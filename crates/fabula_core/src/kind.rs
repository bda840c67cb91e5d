//! Generation kinds, credit categories, and model tiers.

use serde::{Deserialize, Serialize};

/// The finite set of generation actions the pipeline can perform.
///
/// Each kind carries its own credit category, model tier, lock policy,
/// and prediction heuristic, so components select behavior once through
/// these methods instead of branching on strings.
///
/// # Examples
///
/// ```
/// use fabula_core::{CreditKind, GenerationKind};
///
/// assert_eq!(GenerationKind::Metadata.credit_kind(), CreditKind::Text);
/// assert_eq!(GenerationKind::CoverImage.credit_kind(), CreditKind::Image);
/// assert_eq!(GenerationKind::ChapterContent.as_ref(), "chapter_content");
/// ```
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
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GenerationKind {
    /// Characters and locations for a story
    Metadata,
    /// Overall story arcs
    StoryArcs,
    /// Per-chapter detailed guide parts
    ChapterGuide,
    /// Titles and summaries for every chapter
    ChapterSummaries,
    /// Full prose for a single chapter
    ChapterContent,
    /// Story cover image
    CoverImage,
    /// Illustration for a single chapter
    ChapterImage,
}

impl GenerationKind {
    /// The credit pool this kind is billed against.
    pub fn credit_kind(&self) -> CreditKind {
        match self {
            Self::CoverImage | Self::ChapterImage => CreditKind::Image,
            _ => CreditKind::Text,
        }
    }

    /// The model tier this kind is generated with. Images have no tier.
    ///
    /// Metadata runs on the cheap standard tier; everything narrative runs
    /// on the premium tier. Not configurable per request.
    pub fn tier(&self) -> Option<ModelTier> {
        match self {
            Self::Metadata => Some(ModelTier::Standard),
            Self::StoryArcs | Self::ChapterGuide | Self::ChapterSummaries | Self::ChapterContent => {
                Some(ModelTier::Premium)
            }
            Self::CoverImage | Self::ChapterImage => None,
        }
    }

    /// Whether dispatching this kind must hold the per-user generation lock.
    ///
    /// Image kinds deliberately omit the lock so cover and chapter images
    /// can run concurrently with text generation; they never mutate
    /// chapter or arc state. Metadata likewise runs unlocked.
    pub fn requires_lock(&self) -> bool {
        matches!(
            self,
            Self::StoryArcs | Self::ChapterGuide | Self::ChapterSummaries | Self::ChapterContent
        )
    }

    /// Fixed output-token heuristic used only for cost prediction.
    ///
    /// True output length is unknowable before generation; these constants
    /// were chosen empirically and slight underestimation is acceptable
    /// because actual cost is reconciled after the fact. Summaries scale
    /// with chapter count. Image kinds return None.
    pub fn predicted_output_tokens(&self, chapter_count: i64) -> Option<i64> {
        match self {
            Self::Metadata => Some(200),
            Self::StoryArcs => Some(250),
            Self::ChapterGuide => Some(250),
            Self::ChapterSummaries => Some(50 * chapter_count),
            Self::ChapterContent => Some(300),
            Self::CoverImage | Self::ChapterImage => None,
        }
    }

    /// Credit-modifier action name for the input direction.
    pub fn input_action(&self) -> &'static str {
        match self {
            Self::Metadata => "meta_input",
            Self::StoryArcs => "arcs_input",
            Self::ChapterGuide => "chapter_guide_input",
            Self::ChapterSummaries => "summary_input",
            Self::ChapterContent => "chapter_input",
            Self::CoverImage | Self::ChapterImage => "image",
        }
    }

    /// Credit-modifier action name for the output direction.
    pub fn output_action(&self) -> &'static str {
        match self {
            Self::Metadata => "meta_output",
            Self::StoryArcs => "arcs_output",
            Self::ChapterGuide => "chapter_guide_output",
            Self::ChapterSummaries => "summary_output",
            Self::ChapterContent => "chapter_output",
            Self::CoverImage | Self::ChapterImage => "image",
        }
    }

    /// Every distinct credit-modifier action name the pipeline looks up,
    /// in sorted order. Used to seed the modifier table.
    pub fn modifier_actions() -> Vec<&'static str> {
        use strum::IntoEnumIterator;

        let mut actions: Vec<&'static str> = Self::iter()
            .flat_map(|kind| [kind.input_action(), kind.output_action()])
            .collect();
        actions.sort_unstable();
        actions.dedup();
        actions
    }
}

/// Independent per-user credit pools.
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
pub enum CreditKind {
    /// Text generation credits
    Text,
    /// Image generation credits
    Image,
    /// Audio generation credits (reserved for future narration features)
    Audio,
}

/// The two model tiers the pipeline selects between.
///
/// Pricing is configured per tier; the tier for a generation kind is fixed
/// (see [`GenerationKind::tier`]).
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
pub enum ModelTier {
    /// Cheap, fast tier for structured metadata
    Standard,
    /// Higher-quality tier for narrative prose
    Premium,
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_kind_string_round_trip() {
        for kind in GenerationKind::iter() {
            let s = kind.to_string();
            let parsed: GenerationKind = s.parse().expect("should parse back");
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn test_image_kinds_have_no_tier() {
        assert_eq!(GenerationKind::CoverImage.tier(), None);
        assert_eq!(GenerationKind::ChapterImage.tier(), None);
        assert_eq!(GenerationKind::Metadata.tier(), Some(ModelTier::Standard));
        assert_eq!(
            GenerationKind::ChapterContent.tier(),
            Some(ModelTier::Premium)
        );
    }

    #[test]
    fn test_lock_policy() {
        assert!(!GenerationKind::Metadata.requires_lock());
        assert!(!GenerationKind::CoverImage.requires_lock());
        assert!(!GenerationKind::ChapterImage.requires_lock());
        assert!(GenerationKind::StoryArcs.requires_lock());
        assert!(GenerationKind::ChapterSummaries.requires_lock());
        assert!(GenerationKind::ChapterGuide.requires_lock());
        assert!(GenerationKind::ChapterContent.requires_lock());
    }

    #[test]
    fn test_modifier_actions_cover_every_kind() {
        let actions = GenerationKind::modifier_actions();
        for kind in GenerationKind::iter() {
            assert!(actions.contains(&kind.input_action()));
            assert!(actions.contains(&kind.output_action()));
        }
        // Both image kinds share the single "image" action.
        assert_eq!(actions.iter().filter(|a| **a == "image").count(), 1);
    }

    #[test]
    fn test_summaries_heuristic_scales_with_chapters() {
        assert_eq!(
            GenerationKind::ChapterSummaries.predicted_output_tokens(12),
            Some(600)
        );
    }
}
