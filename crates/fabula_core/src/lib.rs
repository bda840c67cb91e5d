//! Core data types for the Fabula generation pipeline.
//!
//! This crate provides the foundation data types used across the Fabula
//! workspace: generation kinds, credit categories, job lifecycle types,
//! pricing configuration, cost breakdowns, exact token counting, and the
//! story snapshots that prompts are rendered from.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod cost;
mod job;
mod kind;
mod pricing;
mod snapshot;
mod token_counting;

pub use cost::{ActualCost, PredictedCost};
pub use job::{JobSpec, JobStatus};
pub use kind::{CreditKind, GenerationKind, ModelTier};
pub use pricing::{CreditModifiers, PricingConfig, TierPricing, FALLBACK_MODIFIER};
pub use snapshot::{
    CharacterSheet, ChapterSnapshot, GuidePart, LocationSheet, StorySnapshot, SummaryEntry,
};
pub use token_counting::count_tokens;
