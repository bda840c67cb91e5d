//! Async worker error types.
//!
//! Worker errors never escape the task runner; they are recorded on the
//! generation job row and converted into realtime error events.

/// Specific error conditions for worker execution.
#[derive(Debug, Clone, PartialEq, derive_more::Display)]
pub enum WorkerErrorKind {
    /// Model output failed to parse as the expected structure
    #[display("Failed to parse {} output: {}", kind, message)]
    OutputParse {
        /// Generation kind being parsed
        kind: String,
        /// Underlying parse error
        message: String,
    },
    /// Model output parsed but was empty or degenerate
    #[display("Degenerate {} output: {}", kind, message)]
    DegenerateOutput {
        /// Generation kind being validated
        kind: String,
        /// What was missing
        message: String,
    },
    /// Target row vanished between dispatch and execution
    #[display("{} not found", _0)]
    TargetMissing(String),
}

/// Error type for worker execution.
///
/// # Examples
///
/// ```
/// use fabula_error::{WorkerError, WorkerErrorKind};
///
/// let err = WorkerError::new(WorkerErrorKind::TargetMissing("Story".to_string()));
/// assert!(format!("{}", err).contains("not found"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Worker Error: {} at line {} in {}", kind, line, file)]
pub struct WorkerError {
    /// The specific error condition
    pub kind: WorkerErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl WorkerError {
    /// Create a new WorkerError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: WorkerErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
