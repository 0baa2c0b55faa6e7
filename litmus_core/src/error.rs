//! Error types for Litmus.

/// Main error type for Litmus.
///
/// Verification failures are not errors: they travel as
/// [`StepOutcome`](crate::step::StepOutcome) values and never abort a run.
#[derive(thiserror::Error, Debug)]
pub enum LitmusError {
    /// Configuration failed validation.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// The completion signal was already sent for this run.
    #[error("Run already marked complete")]
    AlreadyCompleted,

    /// No suite is registered under the requested name.
    #[error("Unknown suite: {0}")]
    UnknownSuite(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Type alias for Result with LitmusError.
pub type Result<T> = std::result::Result<T, LitmusError>;
