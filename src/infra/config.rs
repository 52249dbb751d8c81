// ============================================================
// Layer 6 — Application Configuration
// ============================================================
// Every filesystem location the pipeline touches, gathered in
// one value that is built once at start-up (from CLI flags or
// environment variables) and handed to the registry and the
// use cases. Nothing below the CLI reads the environment.

use std::path::{Path, PathBuf};

use crate::data::splitter::{DEFAULT_SEED, DEFAULT_TEST_FRACTION};

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Root holding one directory per trained bundle
    pub models_dir:        PathBuf,
    /// Pre-seeded bundle used when no model id is requested
    pub default_model_dir: PathBuf,
    /// Base catalogue merged with every training upload
    pub base_dataset:      PathBuf,
    /// Pre-computed cross-validation report for the dashboard
    pub metrics_report:    PathBuf,
    /// Seed for the grouped split and the booster
    pub seed:              u64,
    pub test_fraction:     f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            models_dir:        PathBuf::from("models"),
            default_model_dir: PathBuf::from("models/default"),
            base_dataset:      PathBuf::from("data/base_exoplanet_dataset.csv"),
            metrics_report:    PathBuf::from("training_notebooks/resultados_completos_modelo.json"),
            seed:              DEFAULT_SEED,
            test_fraction:     DEFAULT_TEST_FRACTION,
        }
    }
}

impl AppConfig {
    /// Same layout as the defaults, anchored under `root`.
    pub fn rooted_at(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let d = Self::default();
        Self {
            models_dir:        root.join(&d.models_dir),
            default_model_dir: root.join(&d.default_model_dir),
            base_dataset:      root.join(&d.base_dataset),
            metrics_report:    root.join(&d.metrics_report),
            ..d
        }
    }
}
