//! Job dispatch error types.
//!
//! These map one-to-one onto the synchronous rejection responses of the
//! generation API: validation errors, concurrency conflicts, and
//! affordability errors.

/// Specific error conditions for job dispatch.
#[derive(Debug, Clone, PartialEq, derive_more::Display)]
pub enum DispatchErrorKind {
    /// Target story does not exist
    #[display("Story not found.")]
    StoryNotFound,
    /// Target chapter does not exist
    #[display("Chapter data not found.")]
    ChapterNotFound,
    /// A generation lock is already held for this user
    #[display("A generation task is already in progress.")]
    GenerationInProgress,
    /// Predicted cost exceeds the available balance
    #[display("Not enough credits. required: {}, available: {}", required, available)]
    InsufficientCredits {
        /// Credits the job would cost
        required: i64,
        /// Credits the user currently has
        available: i64,
    },
    /// The user's last job of this kind left the balance non-positive
    #[display("Top up your credits to see generation")]
    OverdraftBlocked,
    /// Kind cannot be handled by the requested operation
    #[display("Unsupported generation kind: {}.", _0)]
    UnsupportedKind(String),
    /// The task queue rejected the job
    #[display("Task queue unavailable: {}", _0)]
    QueueUnavailable(String),
}

/// Error type for job dispatch operations.
///
/// # Examples
///
/// ```
/// use fabula_error::{DispatchError, DispatchErrorKind};
///
/// let err = DispatchError::new(DispatchErrorKind::StoryNotFound);
/// assert!(format!("{}", err).contains("Story not found"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Dispatch Error: {} at line {} in {}", kind, line, file)]
pub struct DispatchError {
    /// The specific error condition
    pub kind: DispatchErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl DispatchError {
    /// Create a new DispatchError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: DispatchErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
