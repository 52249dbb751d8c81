// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the four subcommands and the global path options.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → PathBuf, u64, f64, ...)
//   - fallback to EXO_* environment variables for paths

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::train_use_case::TrainRequest;
use crate::data::splitter::{DEFAULT_SEED, DEFAULT_TEST_FRACTION};
use crate::domain::error::PipelineResult;
use crate::infra::config::AppConfig;
use crate::ml::params::Hyperparameters;

/// Filesystem locations shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Root directory holding one subdirectory per trained bundle
    #[arg(long, global = true, env = "EXO_MODELS_DIR", default_value = "models")]
    pub models_dir: PathBuf,

    /// Pre-seeded bundle used when --model is not given
    #[arg(long, global = true, env = "EXO_DEFAULT_MODEL_DIR", default_value = "models/default")]
    pub default_model_dir: PathBuf,

    /// Base catalogue merged with every training upload
    #[arg(long, global = true, env = "EXO_BASE_DATASET", default_value = "data/base_exoplanet_dataset.csv")]
    pub base_dataset: PathBuf,

    /// Cross-validation report served by `metrics`
    #[arg(
        long,
        global = true,
        env = "EXO_METRICS_REPORT",
        default_value = "training_notebooks/resultados_completos_modelo.json"
    )]
    pub metrics_report: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Retrain on the base catalogue plus an uploaded CSV
    Train(TrainArgs),

    /// Classify the rows of a CSV with a stored model
    Predict(PredictArgs),

    /// List stored models, newest first
    Models,

    /// Print the static cross-validation report
    Metrics,
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// CSV with labelled transits (must include isPlanet)
    #[arg(long)]
    pub file: PathBuf,

    /// Display name stored in the bundle metadata
    #[arg(long)]
    pub name: Option<String>,

    /// Booster overrides as a JSON object,
    /// e.g. '{"n_estimators": 800, "learning_rate": 0.01}'
    #[arg(long)]
    pub hyperparams: Option<String>,

    /// Seed for the grouped split and the booster
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Share of rows held out for evaluation
    #[arg(long, default_value_t = DEFAULT_TEST_FRACTION)]
    pub test_fraction: f64,
}

impl TrainArgs {
    /// Parse the hyperparameter JSON into a request.
    /// Malformed or unknown options fail here, before any data is read.
    pub fn to_request(&self) -> PipelineResult<TrainRequest> {
        let hyperparameters = match &self.hyperparams {
            Some(raw) => Hyperparameters::from_json(raw)?,
            None => Hyperparameters::default(),
        };
        Ok(TrainRequest {
            upload: self.file.clone(),
            name: self.name.clone(),
            hyperparameters,
        })
    }
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    /// CSV with the nine feature columns
    #[arg(long)]
    pub file: PathBuf,

    /// Bundle id from `models`; the default bundle when omitted
    #[arg(long)]
    pub model: Option<String>,
}

/// Convert CLI arguments into the configuration the lower layers see.
/// The application layer never sees clap types.
impl From<&GlobalArgs> for AppConfig {
    fn from(g: &GlobalArgs) -> Self {
        AppConfig {
            models_dir:        g.models_dir.clone(),
            default_model_dir: g.default_model_dir.clone(),
            base_dataset:      g.base_dataset.clone(),
            metrics_report:    g.metrics_report.clone(),
            ..AppConfig::default()
        }
    }
}
