//! Media storage error types.

/// Specific error conditions for media storage operations.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum StorageErrorKind {
    /// Write failed
    #[display("Failed to store media at '{}': {}", key, message)]
    Write {
        /// Storage key
        key: String,
        /// Underlying error
        message: String,
    },
    /// Delete failed
    #[display("Failed to delete media under '{}': {}", prefix, message)]
    Delete {
        /// Storage prefix
        prefix: String,
        /// Underlying error
        message: String,
    },
    /// Key contains path segments the backend rejects
    #[display("Invalid storage key: {}", _0)]
    InvalidKey(String),
}

/// Error type for media storage operations.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Storage Error: {} at line {} in {}", kind, line, file)]
pub struct StorageError {
    /// The specific error condition
    pub kind: StorageErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl StorageError {
    /// Create a new StorageError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: StorageErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
