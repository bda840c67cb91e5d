//! Model provider error types.

/// Specific error conditions for model provider calls.
#[derive(Debug, Clone, PartialEq, derive_more::Display)]
pub enum ProviderErrorKind {
    /// Transport-level failure reaching the provider
    #[display("Provider request failed: {}", _0)]
    Request(String),
    /// Provider returned a non-success status
    #[display("Provider API error (status {}): {}", status, message)]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body or error message
        message: String,
    },
    /// Provider response carried no usable content
    #[display("Provider response contained no content")]
    EmptyResponse,
    /// Image payload could not be decoded
    #[display("Failed to decode image payload: {}", _0)]
    ImageDecode(String),
}

/// Error type for model provider operations.
///
/// # Examples
///
/// ```
/// use fabula_error::{ProviderError, ProviderErrorKind};
///
/// let err = ProviderError::new(ProviderErrorKind::EmptyResponse);
/// assert!(format!("{}", err).contains("no content"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Provider Error: {} at line {} in {}", kind, line, file)]
pub struct ProviderError {
    /// The specific error condition
    pub kind: ProviderErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl ProviderError {
    /// Create a new ProviderError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ProviderErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
