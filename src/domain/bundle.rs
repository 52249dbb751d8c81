// ============================================================
// Layer 3 — Trained Bundle Types
// ============================================================
// A bundle is the unit the registry persists:
//
//   models/
//     model_20261018_153000_123456/
//       classifier.json        ← boosted tree ensemble
//       scaler.json            ← per-feature mean / scale
//       metadata/
//         metadata.json        ← name, paths, params, metrics
//
// Bundles are write-once. A new training run always produces
// a new bundle; nothing ever rewrites an existing one.

use serde::{Deserialize, Serialize};

use crate::data::scaler::ScalerState;
use crate::domain::error::{PipelineError, PipelineResult};
use crate::ml::evaluator::EvaluationMetrics;
use crate::ml::model::BoostedEnsemble;
use crate::ml::params::BoosterParams;

/// Directory name of a persisted bundle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BundleId(String);

impl BundleId {
    /// Accept only plain directory names. Anything that could
    /// escape the models directory can never name a bundle.
    pub fn parse(raw: &str) -> PipelineResult<Self> {
        let trimmed = raw.trim();
        let invalid = trimmed.is_empty()
            || trimmed.starts_with('.')
            || trimmed.contains('/')
            || trimmed.contains('\\')
            || trimmed.contains("..");
        if invalid {
            return Err(PipelineError::BundleNotFound(raw.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub(crate) fn new_unchecked(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BundleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything a training run knows about its bundle before
/// the registry assigns an identifier and artifact paths.
#[derive(Debug, Clone)]
pub struct BundleDraft {
    pub classifier:      BoostedEnsemble,
    pub scaler:          ScalerState,
    /// Custom display name; the registry derives one when absent
    pub name:            Option<String>,
    pub feature_columns: Vec<String>,
    pub params:          BoosterParams,
    pub metrics:         EvaluationMetrics,
    pub train_rows:      usize,
    pub test_rows:       usize,
}

/// Contents of metadata/metadata.json.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleMetadata {
    pub model_name:  String,
    pub model_path:  String,
    pub scaler_path: String,
    /// `YYYYmmdd_HHMMSS`
    pub created_at:  String,
    #[serde(default)]
    pub created_at_rfc3339: Option<String>,
    /// The exact feature contract the bundle was trained with.
    /// Older or hand-seeded bundles may not carry one.
    #[serde(default)]
    pub feature_columns: Option<Vec<String>>,
    pub params:  BoosterParams,
    pub metrics: EvaluationMetrics,
    #[serde(default)]
    pub train_rows: usize,
    #[serde(default)]
    pub test_rows:  usize,
}

/// Where `save` put the artifacts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavedBundle {
    pub id:            BundleId,
    pub model_path:    String,
    pub scaler_path:   String,
    pub metadata_path: String,
    pub metadata:      BundleMetadata,
}

/// Metadata as reported by `list`: parsed, or a placeholder
/// describing why it could not be read.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EntryMetadata {
    Loaded(Box<BundleMetadata>),
    Error { error: String },
}

impl EntryMetadata {
    pub fn is_error(&self) -> bool {
        matches!(self, EntryMetadata::Error { .. })
    }
}

/// One row of the model listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BundleEntry {
    pub model_name: BundleId,
    pub model_path: String,
    pub metadata:   EntryMetadata,
}

/// A bundle read back from storage, ready for scoring.
#[derive(Debug, Clone)]
pub struct LoadedBundle {
    /// `None` for the default bundle
    pub id:              Option<BundleId>,
    pub classifier:      BoostedEnsemble,
    pub scaler:          ScalerState,
    /// Contract persisted with the bundle, if any
    pub feature_columns: Option<Vec<String>>,
}
