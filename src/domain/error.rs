// ============================================================
// Layer 3 — Pipeline Errors
// ============================================================
// Every failure the pipeline can surface to a caller.
//
// Each variant maps to one response class at the boundary:
//   400 — the caller sent something invalid
//   404 — the requested bundle / report does not exist
//   422 — the data is valid but cannot support the operation
//   500 — anything unanticipated (details stay server-side)

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Required columns are absent from the uploaded table.
    #[error("missing columns in CSV: {missing:?}, columns received: {present:?}")]
    SchemaValidation {
        missing: Vec<String>,
        present: Vec<String>,
    },

    /// A feature or label cell could not be read as a number.
    #[error("invalid value {value:?} in column '{column}' at row {row}")]
    InvalidFeatureValue {
        column: String,
        row:    usize,
        value:  String,
    },

    #[error("invalid hyperparameters: {0}")]
    InvalidHyperparameter(String),

    #[error("file must be a CSV: {0}")]
    UnsupportedFile(String),

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("degenerate feature '{column}': {reason}")]
    DegenerateFeature {
        column: String,
        reason: String,
    },

    #[error("cannot compute metrics: {0}")]
    MetricComputation(String),

    #[error("model bundle '{0}' not found")]
    BundleNotFound(String),

    #[error("default model is missing")]
    DefaultModelMissing,

    #[error("no trained models found")]
    NoModels,

    #[error("metrics report not found")]
    MetricsReportMissing,

    /// Unanticipated failure. The message is logged, never shown.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// HTTP-equivalent status used by the CLI boundary.
    pub fn status_code(&self) -> u16 {
        match self {
            PipelineError::SchemaValidation { .. }
            | PipelineError::InvalidFeatureValue { .. }
            | PipelineError::InvalidHyperparameter(_)
            | PipelineError::UnsupportedFile(_) => 400,

            PipelineError::BundleNotFound(_)
            | PipelineError::DefaultModelMissing
            | PipelineError::NoModels
            | PipelineError::MetricsReportMissing => 404,

            PipelineError::InsufficientData(_)
            | PipelineError::DegenerateFeature { .. }
            | PipelineError::MetricComputation(_) => 422,

            PipelineError::Internal(_) => 500,
        }
    }

    /// True when the message may be shown to the caller verbatim.
    pub fn is_user_facing(&self) -> bool {
        self.status_code() != 500
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
