//! The durable audit record of a generation job.

use chrono::{DateTime, Utc};
use fabula_core::{GenerationKind, JobStatus};
use serde::{Deserialize, Serialize};

/// One row of the generation audit log, as read back from persistence.
///
/// Fields in the `Option` group are populated at settlement: actual cost
/// and token figures on success, `error` on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Task id assigned at dispatch
    pub task_id: String,
    /// Owning user
    pub user_id: i32,
    /// Story the job targeted
    pub story_id: i32,
    /// What was generated
    pub kind: GenerationKind,
    /// Current lifecycle status
    pub status: JobStatus,
    /// Credit cost predicted at dispatch
    pub predicted_cost: i64,
    /// Reconciled credit cost, set on success
    pub actual_cost: Option<i64>,
    /// Measured input token count, set on success for text kinds
    pub input_tokens: Option<i64>,
    /// Measured output token count, set on success for text kinds
    pub output_tokens: Option<i64>,
    /// Model the job ran on, set on success for text kinds
    pub model: Option<String>,
    /// Failure description, set on failure
    pub error: Option<String>,
    /// When the job was dispatched
    pub created_at: DateTime<Utc>,
    /// When the job last changed status
    pub updated_at: DateTime<Utc>,
}
