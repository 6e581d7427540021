use thiserror::Error;

/// Failure classes surfaced by the scan pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    /// Structurally malformed input; nothing is logged.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// A model artifact failed to load or validate. Fatal at startup.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),
    /// Scoring failed after a valid extraction (e.g. reputation timeout); nothing is logged.
    #[error("scorer failed: {0}")]
    Scorer(String),
    /// Explainer failed; the scan continues without an explanation.
    #[error("explanation unavailable: {0}")]
    ExplanationUnavailable(String),
    /// The durable scan log could not be opened, read or written.
    #[error("scan log unavailable: {0}")]
    StoreUnavailable(String),
}

impl ScanError {
    pub fn invalid(msg: impl Into<String>) -> Self { ScanError::InvalidInput(msg.into()) }
    pub fn model(msg: impl Into<String>) -> Self { ScanError::ModelUnavailable(msg.into()) }
    pub fn scorer(msg: impl Into<String>) -> Self { ScanError::Scorer(msg.into()) }
    pub fn explanation(msg: impl Into<String>) -> Self { ScanError::ExplanationUnavailable(msg.into()) }
    pub fn store(msg: impl Into<String>) -> Self { ScanError::StoreUnavailable(msg.into()) }

    /// Short machine-readable code, used in JSON output.
    pub fn code(&self) -> &'static str {
        match self {
            ScanError::InvalidInput(_) => "invalid_input",
            ScanError::ModelUnavailable(_) => "model_unavailable",
            ScanError::Scorer(_) => "scorer_error",
            ScanError::ExplanationUnavailable(_) => "explanation_unavailable",
            ScanError::StoreUnavailable(_) => "store_unavailable",
        }
    }
}

pub type Result<T, E = ScanError> = std::result::Result<T, E>;
