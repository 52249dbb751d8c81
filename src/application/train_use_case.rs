// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Resolve hyperparameters     (Layer 5 - ml)
//   Step 2: Load base + uploaded CSVs   (Layer 4 - data)
//   Step 3: Validate and parse rows     (Layer 4 - data)
//   Step 4: Grouped train/test split    (Layer 4 - data)
//   Step 5: Fit the scaler on train     (Layer 4 - data)
//   Step 6: Fit the booster             (Layer 5 - ml)
//   Step 7: Score the held-out split    (Layer 5 - ml)
//   Step 8: Persist the bundle          (Layer 6 - infra)

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;

use crate::data::{
    contract::FeatureContract,
    dataset::LabeledDataset,
    loader::{ensure_csv_extension, CsvTable},
    scaler::Scaler,
    splitter::split_by_group,
};
use crate::domain::bundle::{BundleDraft, BundleId};
use crate::domain::error::PipelineError;
use crate::domain::traits::ModelRegistry;
use crate::infra::config::AppConfig;
use crate::ml::{
    evaluator::{evaluate, EvaluationMetrics},
    inferencer::Inferencer,
    params::Hyperparameters,
    trainer,
};

pub const SUCCESS_MESSAGE: &str = "Model and scaler successfully trained and saved!";

/// One training request, as received from the boundary.
#[derive(Debug, Clone, Default)]
pub struct TrainRequest {
    pub upload:          PathBuf,
    pub name:            Option<String>,
    pub hyperparameters: Hyperparameters,
}

/// What a successful run reports back.
#[derive(Debug, Clone, Serialize)]
pub struct TrainOutcome {
    pub message:       String,
    pub model_id:      BundleId,
    pub metrics:       EvaluationMetrics,
    pub model_path:    String,
    pub scaler_path:   String,
    pub metadata_path: String,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase<'a> {
    config:   &'a AppConfig,
    registry: &'a dyn ModelRegistry,
}

impl<'a> TrainUseCase<'a> {
    pub fn new(config: &'a AppConfig, registry: &'a dyn ModelRegistry) -> Self {
        Self { config, registry }
    }

    /// Train on the configured base dataset plus the uploaded file.
    pub fn execute(&self, request: &TrainRequest) -> Result<TrainOutcome> {
        ensure_csv_extension(&request.upload)?;

        let base = CsvTable::from_path(&self.config.base_dataset)
            .context("Base dataset is unavailable")?;
        let upload = CsvTable::from_path(&request.upload)?;

        self.execute_tables(base, upload, request)
    }

    /// Train on already-loaded tables.
    pub fn execute_tables(
        &self,
        base:    CsvTable,
        upload:  CsvTable,
        request: &TrainRequest,
    ) -> Result<TrainOutcome> {
        let cfg = self.config;

        // ── Step 1: Resolve hyperparameters once ─────────────────────────────
        let params = request.hyperparameters.resolve()?;

        // ── Step 2: Merge base catalogue and upload ──────────────────────────
        tracing::info!(
            "Starting training: {} base rows + {} uploaded rows",
            base.len(),
            upload.len()
        );
        if upload.is_empty() {
            tracing::warn!("Uploaded file has no data rows; training on the base dataset only");
        }
        let merged = base.merge(upload);
        tracing::info!("Combined dataset contains {} rows", merged.len());

        // ── Step 3: Validate and parse ───────────────────────────────────────
        let contract = FeatureContract::canonical();
        let dataset  = LabeledDataset::from_table(&merged, &contract)?;
        if dataset.is_empty() {
            return Err(PipelineError::InsufficientData("combined dataset has no rows".into()).into());
        }

        // ── Step 4: Grouped split by star system ─────────────────────────────
        let split = split_by_group(&dataset.groups, cfg.test_fraction, cfg.seed)?;
        let train = dataset.select(&split.train);
        let test  = dataset.select(&split.test);
        tracing::info!(
            "Train: {} samples ({} planets) | Test: {} samples ({:.1}%)",
            train.len(),
            train.positive_count(),
            test.len(),
            split.test_fraction() * 100.0
        );

        // ── Step 5: Standardise with train statistics ────────────────────────
        let scaler  = Scaler::fit(&train.features, contract.columns())?;
        let x_train = scaler.transform(&train.features)?;

        // ── Step 6: Fit the booster ──────────────────────────────────────────
        let classifier = trainer::train(&x_train, &train.labels, &params, cfg.seed)?;

        // ── Step 7: Held-out metrics ─────────────────────────────────────────
        let scored = Inferencer::new(&scaler, &classifier)?.score(&test.features)?;
        let y_pred:  Vec<bool> = scored.iter().map(|(label, _)| *label).collect();
        let y_score: Vec<f64>  = scored.iter().map(|(_, p)| *p).collect();
        let metrics = evaluate(&test.labels, &y_pred, &y_score)?;
        tracing::info!(
            "Held-out metrics: accuracy={:.4} auc_roc={:.4} auc_prc={:.4} f1_planet={:.4}",
            metrics.accuracy, metrics.auc_roc, metrics.auc_prc, metrics.f1_score_planet
        );

        // ── Step 8: Persist ──────────────────────────────────────────────────
        let saved = self.registry.save(&BundleDraft {
            classifier,
            scaler,
            name:            request.name.clone(),
            feature_columns: contract.columns().to_vec(),
            params,
            metrics:         metrics.clone(),
            train_rows:      train.len(),
            test_rows:       test.len(),
        })?;

        Ok(TrainOutcome {
            message:       SUCCESS_MESSAGE.to_string(),
            model_id:      saved.id,
            metrics,
            model_path:    saved.model_path,
            scaler_path:   saved.scaler_path,
            metadata_path: saved.metadata_path,
        })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data::contract::CANONICAL_FEATURES;
    use crate::infra::registry::FsModelRegistry;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::fmt::Write as _;
    use tempfile::TempDir;

    /// `groups` stars with `per_group` transits each, alternating
    /// planet / false positive so every star carries both labels.
    /// Planets sit higher on every feature, plus noise.
    pub(crate) fn synthetic_csv(groups: usize, per_group: usize, seed: u64) -> String {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut out = String::from("transit_id,ra,dec,source");
        for f in CANONICAL_FEATURES {
            out.push(',');
            out.push_str(f);
        }
        out.push_str(",isPlanet\n");

        for row in 0..groups * per_group {
            let star   = row / per_group;
            let planet = row % 2 == 0;
            let shift  = if planet { 1.5 } else { 0.0 };
            write!(out, "T{row},{}.5,{}.25,kepler", 100 + star, -30 + star as i64).unwrap();
            for (k, _) in CANONICAL_FEATURES.iter().enumerate() {
                let value = (k as f64 + 1.0) * 10.0 + shift * (k as f64 + 1.0) + rng.gen_range(-1.0..1.0);
                write!(out, ",{value:.6}").unwrap();
            }
            writeln!(out, ",{}", u8::from(planet)).unwrap();
        }
        out
    }

    pub(crate) fn table(csv: &str) -> CsvTable {
        CsvTable::from_reader(csv.as_bytes()).unwrap()
    }

    /// First `rows` data lines of `csv` as their own table, and the rest.
    fn halves(csv: &str, rows: usize) -> (CsvTable, CsvTable) {
        let mut lines = csv.lines();
        let header = lines.next().unwrap();
        let body: Vec<&str> = lines.collect();
        let first  = format!("{header}\n{}\n", body[..rows].join("\n"));
        let second = format!("{header}\n{}\n", body[rows..].join("\n"));
        (table(&first), table(&second))
    }

    fn quick_request() -> TrainRequest {
        TrainRequest {
            hyperparameters: Hyperparameters::from_json(r#"{"n_estimators": 40, "learning_rate": 0.1}"#)
                .unwrap(),
            ..TrainRequest::default()
        }
    }

    #[test]
    fn test_end_to_end_with_default_hyperparameters() {
        let dir = TempDir::new().unwrap();
        let cfg = AppConfig::rooted_at(dir.path());
        let registry = FsModelRegistry::new(&cfg);
        let use_case = TrainUseCase::new(&cfg, &registry);

        let (base, upload) = halves(&synthetic_csv(40, 5, 1), 150);
        let outcome = use_case
            .execute_tables(base, upload, &TrainRequest::default())
            .unwrap();

        assert_eq!(outcome.message, SUCCESS_MESSAGE);
        assert!((0.0..=1.0).contains(&outcome.metrics.accuracy));
        assert!((0.0..=1.0).contains(&outcome.metrics.auc_roc));
        // 15% of 200 rows, whole stars of 5 transits each
        assert_eq!(outcome.metrics.test_samples, 30);

        let listed = registry.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].model_name, outcome.model_id);
        match &listed[0].metadata {
            crate::domain::bundle::EntryMetadata::Loaded(meta) => {
                assert_eq!(meta.params.n_estimators, 1600);
                assert_eq!(meta.test_rows, 30);
                assert_eq!(meta.train_rows, 170);
                assert_eq!(meta.feature_columns.as_ref().unwrap().len(), 9);
            }
            other => panic!("unexpected metadata {other:?}"),
        }
    }

    #[test]
    fn test_training_is_deterministic() {
        let csv = synthetic_csv(30, 4, 9);
        let run = || {
            let dir = TempDir::new().unwrap();
            let cfg = AppConfig::rooted_at(dir.path());
            let registry = FsModelRegistry::new(&cfg);
            let (base, upload) = halves(&csv, 60);
            TrainUseCase::new(&cfg, &registry)
                .execute_tables(base, upload, &quick_request())
                .unwrap()
                .metrics
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_missing_label_column_is_schema_error() {
        let dir = TempDir::new().unwrap();
        let cfg = AppConfig::rooted_at(dir.path());
        let registry = FsModelRegistry::new(&cfg);
        let csv = synthetic_csv(10, 2, 3).replace(",isPlanet", ",label");
        let (base, upload) = halves(&csv, 10);

        let err = TrainUseCase::new(&cfg, &registry)
            .execute_tables(base, upload, &quick_request())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::SchemaValidation { .. })
        ));
        assert!(registry.list().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_hyperparameter_fails_before_training() {
        let err = Hyperparameters::from_json(r#"{"boosting": "dart"}"#).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidHyperparameter(_)));
    }

    #[test]
    fn test_one_star_is_insufficient() {
        let dir = TempDir::new().unwrap();
        let cfg = AppConfig::rooted_at(dir.path());
        let registry = FsModelRegistry::new(&cfg);
        let (base, upload) = halves(&synthetic_csv(1, 20, 3), 10);

        let err = TrainUseCase::new(&cfg, &registry)
            .execute_tables(base, upload, &quick_request())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_execute_reads_files_and_names_the_bundle() {
        let dir = TempDir::new().unwrap();
        let cfg = AppConfig::rooted_at(dir.path());
        let registry = FsModelRegistry::new(&cfg);

        let csv = synthetic_csv(20, 4, 5);
        std::fs::create_dir_all(cfg.base_dataset.parent().unwrap()).unwrap();
        std::fs::write(&cfg.base_dataset, &csv).unwrap();
        let upload = dir.path().join("upload.csv");
        std::fs::write(&upload, synthetic_csv(5, 4, 6).replace("T", "U")).unwrap();

        let request = TrainRequest { upload, name: Some("kepler-v2".into()), ..quick_request() };
        let outcome = TrainUseCase::new(&cfg, &registry).execute(&request).unwrap();
        assert!(std::path::Path::new(&outcome.metadata_path).is_file());

        let meta: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&outcome.metadata_path).unwrap()).unwrap();
        assert_eq!(meta["model_name"], "kepler-v2");
        assert_eq!(meta["params"]["n_estimators"], 40);
        assert_eq!(meta["params"]["num_leaves"], 350);
    }

    #[test]
    fn test_non_csv_upload_is_rejected() {
        let dir = TempDir::new().unwrap();
        let cfg = AppConfig::rooted_at(dir.path());
        let registry = FsModelRegistry::new(&cfg);
        let request = TrainRequest { upload: dir.path().join("upload.xlsx"), ..quick_request() };

        let err = TrainUseCase::new(&cfg, &registry).execute(&request).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::UnsupportedFile(_))
        ));
    }
}
