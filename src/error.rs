//! Error taxonomy for the prediction pipeline.

use thiserror::Error;

/// Errors surfaced by ingestion and the forecasting pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictionError {
    /// A reading is missing one or more required fields and was rejected.
    #[error("incomplete reading: missing {}", .missing.join(", "))]
    IncompleteReading { missing: Vec<&'static str> },

    /// Not enough history to build a complete feature row yet.
    #[error("insufficient data: {available} readings available, {required} required")]
    InsufficientData { available: usize, required: usize },

    /// The engineered features do not contain the columns the model was fit with.
    #[error("feature mismatch: {} of {expected} expected columns missing (first: {})",
        .missing.len(),
        .missing.first().map(String::as_str).unwrap_or("-"))]
    FeatureMismatch { missing: Vec<String>, expected: usize },

    /// Model artifacts are unavailable; only the rule-based scorer can run.
    #[error("models not loaded: {reason}")]
    ModelNotLoaded { reason: String },

    /// Loaded artifacts disagree with each other or with the input schema.
    #[error("artifact mismatch: {0}")]
    ArtifactMismatch(String),

    /// A model produced output that cannot be interpreted.
    #[error("invalid model output: {0}")]
    InvalidModelOutput(String),
}

impl PredictionError {
    /// Whether waiting for more telemetry can resolve this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PredictionError::InsufficientData { .. })
    }

    /// Short machine-readable code used by the API layer.
    pub fn code(&self) -> &'static str {
        match self {
            PredictionError::IncompleteReading { .. } => "INCOMPLETE_READING",
            PredictionError::InsufficientData { .. } => "INSUFFICIENT_DATA",
            PredictionError::FeatureMismatch { .. } => "FEATURE_MISMATCH",
            PredictionError::ModelNotLoaded { .. } => "MODEL_NOT_LOADED",
            PredictionError::ArtifactMismatch(_) => "ARTIFACT_MISMATCH",
            PredictionError::InvalidModelOutput(_) => "INVALID_MODEL_OUTPUT",
        }
    }
}

/// Convenience alias for pipeline results.
pub type PredictionResult<T> = Result<T, PredictionError>;
