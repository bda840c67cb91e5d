//! Generation pipeline: dispatch, queueing, execution, settlement.
//!
//! This crate carries the full lifecycle of a generation job. The
//! [`JobDispatcher`] prices and validates a request, records a pending
//! job, and enqueues it; [`spawn_workers`] drains the queue into a
//! [`JobWorker`], which calls the model, persists output, reconciles the
//! cost against real token usage, and settles credits atomically.
//! Default backends for the model provider, media storage, lock, queue,
//! and notifier live here too; every seam is a trait from
//! `fabula_interface`, so any piece swaps out in tests or deployment.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod dispatcher;
mod driver;
mod estimator;
mod lock;
mod notifier;
/// Model output parsing.
pub mod parse;
/// Prompt rendering and media key layout.
pub mod prompts;
mod queue;
mod storage;
mod worker;

pub use dispatcher::{DispatchReceipt, JobDispatcher, dispatch_rejection};
pub use driver::HttpModelDriver;
pub use estimator::CostEstimator;
pub use lock::{DEFAULT_LOCK_TTL, TtlLock};
pub use notifier::BroadcastNotifier;
pub use queue::{InProcessQueue, spawn_workers};
pub use storage::FilesystemStorage;
pub use worker::JobWorker;
