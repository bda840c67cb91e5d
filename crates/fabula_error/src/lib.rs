//! Error types for the Fabula generation pipeline.
//!
//! This crate provides the foundation error types used throughout the Fabula
//! workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern for clean error
//! handling:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use fabula_error::{ConfigError, FabulaResult};
//!
//! fn load_pricing() -> FabulaResult<f64> {
//!     Err(ConfigError::new("pricing configuration missing"))?
//! }
//!
//! match load_pricing() {
//!     Ok(v) => println!("Got: {}", v),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
#[cfg(feature = "database")]
mod database;
mod dispatch;
mod error;
mod estimator;
mod json;
mod provider;
mod storage;
mod worker;

pub use config::ConfigError;
#[cfg(feature = "database")]
pub use database::{DatabaseError, DatabaseErrorKind};
pub use dispatch::{DispatchError, DispatchErrorKind};
pub use error::{FabulaError, FabulaErrorKind, FabulaResult};
pub use estimator::{EstimatorError, EstimatorErrorKind};
pub use json::JsonError;
pub use provider::{ProviderError, ProviderErrorKind};
pub use storage::{StorageError, StorageErrorKind};
pub use worker::{WorkerError, WorkerErrorKind};
