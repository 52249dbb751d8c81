// ============================================================
// Layer 4 — Feature Contract
// ============================================================
// The ordered list of columns a bundle consumes. The order is
// the column order of the feature matrix, so the contract used
// at inference must be the one the bundle was trained with.

use serde::{Deserialize, Serialize};

use crate::domain::error::{PipelineError, PipelineResult};

/// Canonical transit features, in matrix order.
pub const CANONICAL_FEATURES: [&str; 9] = [
    "pl_period",
    "pl_transit_duration",
    "pl_transit_depth",
    "pl_radius",
    "pl_eq_temp",
    "pl_insolation_flux",
    "st_eff_temp",
    "st_radius",
    "st_logg",
];

pub const TRANSIT_ID_COLUMN: &str = "transit_id";
pub const LABEL_COLUMN:      &str = "isPlanet";
pub const RA_COLUMN:         &str = "ra";
pub const DEC_COLUMN:        &str = "dec";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureContract {
    columns: Vec<String>,
}

impl FeatureContract {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    /// The nine-column contract every new bundle is trained with.
    pub fn canonical() -> Self {
        Self::new(CANONICAL_FEATURES.iter().map(|c| c.to_string()).collect())
    }

    /// Contract persisted with a bundle, or the canonical one for
    /// bundles that predate persisted contracts.
    pub fn for_bundle(persisted: Option<&[String]>) -> Self {
        match persisted {
            Some(cols) if !cols.is_empty() => Self::new(cols.to_vec()),
            _ => Self::canonical(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Check that every required column is among `headers`.
    /// Headers are expected to be trimmed already.
    pub fn validate(&self, headers: &[String]) -> PipelineResult<()> {
        let missing: Vec<String> = self
            .columns
            .iter()
            .filter(|col| !headers.iter().any(|h| h == *col))
            .cloned()
            .collect();

        if missing.is_empty() {
            return Ok(());
        }

        tracing::debug!("Feature contract violated, missing {:?}", missing);
        Err(PipelineError::SchemaValidation {
            missing,
            present: headers.to_vec(),
        })
    }

    /// Position of each contract column within `headers`.
    pub fn column_indices(&self, headers: &[String]) -> PipelineResult<Vec<usize>> {
        self.validate(headers)?;
        Ok(self
            .columns
            .iter()
            .filter_map(|col| headers.iter().position(|h| h == col))
            .collect())
    }
}
