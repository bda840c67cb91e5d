//! HTTP API and worker runtime for Fabula generation.
//!
//! Wires the Postgres repositories, the in-process queue and worker pool,
//! and the axum routes into one binary. Configuration comes from
//! `fabula.toml` plus `FABULA_` environment variables.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod routes;

pub use config::{FabulaConfig, MediaConfig, ModelConfig};
pub use error::ApiError;
pub use routes::{AppState, UserId, router};
