//! Trait definitions for the Fabula generation pipeline.
//!
//! This crate provides the seams between the pipeline and its backends:
//! model drivers, media storage, the task queue, the per-user generation
//! lock, realtime notification, and the persistence repositories. The
//! pipeline crates depend only on these traits; concrete implementations
//! live in `fabula_database`, `fabula_pipeline`, and test fakes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod event;
mod record;
mod repository;
mod traits;

pub use event::GenerationEvent;
pub use record::JobRecord;
pub use repository::{CreditLedger, GenerationJobRepository, PricingStore, StoryStore};
pub use traits::{Completion, GenerationLock, MediaStorage, ModelDriver, Notifier, TaskQueue};
