use thiserror::Error;

/// Hard failures of the synthesis pipeline.
///
/// Everything that only degrades the result (timeouts, empty content,
/// ambiguous markers) is reported as a [`crate::diagnostics::Diagnostic`]
/// instead.
#[derive(Debug, Error)]
pub enum TocError {
    #[error("Invalid CSS selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}
