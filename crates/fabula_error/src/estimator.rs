//! Cost estimator error types.

/// Specific error conditions for cost estimation.
#[derive(Debug, Clone, PartialEq, derive_more::Display)]
pub enum EstimatorErrorKind {
    /// Pricing configuration is missing; the estimator cannot function without it
    #[display("Pricing configuration missing: {}", _0)]
    MissingPricing(String),
    /// Pricing configuration contains an unusable value
    #[display("Invalid pricing value for {}: {}", field, value)]
    InvalidPricing {
        /// Configuration field name
        field: String,
        /// The offending value
        value: f64,
    },
    /// Tokenizer could not be loaded for the requested model
    #[display("Tokenizer unavailable for model '{}': {}", model, message)]
    Tokenizer {
        /// Model identifier
        model: String,
        /// Underlying error
        message: String,
    },
}

/// Error type for cost estimation operations.
///
/// # Examples
///
/// ```
/// use fabula_error::{EstimatorError, EstimatorErrorKind};
///
/// let err = EstimatorError::new(EstimatorErrorKind::MissingPricing(
///     "no pricing row".to_string(),
/// ));
/// assert!(format!("{}", err).contains("missing"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Estimator Error: {} at line {} in {}", kind, line, file)]
pub struct EstimatorError {
    /// The specific error condition
    pub kind: EstimatorErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl EstimatorError {
    /// Create a new EstimatorError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: EstimatorErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
