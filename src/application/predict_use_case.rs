// ============================================================
// Layer 2 — PredictUseCase
// ============================================================
// Scores an uploaded table with a stored bundle:
//
//   Step 1: Resolve the bundle (by id, or the default one)
//   Step 2: Pick the feature contract it was trained with
//   Step 3: Validate headers and parse feature cells
//   Step 4: Scale + score every row, keeping input order

use anyhow::Result;
use std::path::Path;

use crate::data::{
    contract::FeatureContract,
    dataset::UnlabeledDataset,
    loader::{ensure_csv_extension, CsvTable},
};
use crate::domain::bundle::{BundleId, LoadedBundle};
use crate::domain::error::PipelineError;
use crate::domain::traits::ModelRegistry;
use crate::domain::transit::PredictionResult;
use crate::ml::inferencer::Inferencer;

pub struct PredictUseCase<'a> {
    registry: &'a dyn ModelRegistry,
}

impl<'a> PredictUseCase<'a> {
    pub fn new(registry: &'a dyn ModelRegistry) -> Self {
        Self { registry }
    }

    /// Read `path` and score it.
    pub fn predict_file(&self, path: &Path, bundle_id: Option<&str>) -> Result<Vec<PredictionResult>> {
        ensure_csv_extension(path)?;
        let table = CsvTable::from_path(path)?;
        self.predict_table(&table, bundle_id)
    }

    /// One result per row of `table`, in input order.
    pub fn predict_table(
        &self,
        table:     &CsvTable,
        bundle_id: Option<&str>,
    ) -> Result<Vec<PredictionResult>> {
        // ── Step 1: Resolve ──────────────────────────────────────────────────
        let bundle = self.resolve(bundle_id)?;

        // ── Step 2: Contract persisted with the bundle ───────────────────────
        let contract = FeatureContract::for_bundle(bundle.feature_columns.as_deref());
        if contract.len() != bundle.scaler.width() {
            return Err(PipelineError::Internal(format!(
                "bundle contract has {} columns but its scaler expects {}",
                contract.len(),
                bundle.scaler.width()
            ))
            .into());
        }

        // ── Step 3: Validate + parse ─────────────────────────────────────────
        let dataset = UnlabeledDataset::from_table(table, &contract)?;
        if dataset.is_empty() {
            tracing::warn!("Prediction input has no data rows");
            return Ok(Vec::new());
        }

        // ── Step 4: Score ────────────────────────────────────────────────────
        let scored = Inferencer::from_bundle(&bundle)?.score(&dataset.features)?;
        let results: Vec<PredictionResult> = dataset
            .transit_ids
            .into_iter()
            .zip(scored)
            .map(|(id, (is_planet, confidence))| PredictionResult::new(id, is_planet, confidence))
            .collect();
        tracing::info!(
            "Scored {} rows with bundle '{}': {} classified as planets",
            results.len(),
            bundle.id.as_ref().map_or("default", BundleId::as_str),
            results.iter().filter(|r| r.is_planet()).count()
        );
        Ok(results)
    }

    fn resolve(&self, bundle_id: Option<&str>) -> Result<LoadedBundle> {
        let bundle = match bundle_id.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => self.registry.load(&BundleId::parse(raw)?)?,
            None => self.registry.load_default()?,
        };
        Ok(bundle)
    }
}
