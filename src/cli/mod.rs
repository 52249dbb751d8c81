// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Four commands are supported, each printing JSON to stdout:
//   1. `train`   — retrain and store a new bundle
//   2. `predict` — score a CSV with a stored bundle
//   3. `models`  — list stored bundles
//   4. `metrics` — static cross-validation report
//
// Failures are mapped here: pipeline errors print their
// message and status class, anything else is logged in full
// and reported as a generic internal error.

pub mod commands;

use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use std::process::ExitCode;

use commands::{Commands, GlobalArgs, PredictArgs, TrainArgs};

use crate::application::{
    catalog_use_case::CatalogUseCase,
    predict_use_case::PredictUseCase,
    train_use_case::TrainUseCase,
};
use crate::domain::error::PipelineError;
use crate::infra::{config::AppConfig, registry::FsModelRegistry};

#[derive(Parser, Debug)]
#[command(
    name = "exoplanet-ai",
    version,
    about = "Train and serve a gradient-boosted exoplanet transit classifier."
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Run the subcommand and turn any failure into an exit code.
    pub fn run(self) -> ExitCode {
        match self.dispatch() {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                let (status, message) = describe_failure(&err);
                eprintln!("{}", serde_json::json!({ "status": status, "detail": message }));
                ExitCode::FAILURE
            }
        }
    }

    fn dispatch(&self) -> Result<()> {
        let config = AppConfig::from(&self.global);
        let registry = FsModelRegistry::new(&config);
        tracing::debug!("Models directory: '{}'", registry.root().display());

        match &self.command {
            Commands::Train(args)   => self.run_train(&config, &registry, args),
            Commands::Predict(args) => self.run_predict(&registry, args),
            Commands::Models => {
                print_json(&CatalogUseCase::new(&config, &registry).list_models()?)
            }
            Commands::Metrics => {
                print_json(&CatalogUseCase::new(&config, &registry).metrics_report()?)
            }
        }
    }

    fn run_train(&self, config: &AppConfig, registry: &FsModelRegistry, args: &TrainArgs) -> Result<()> {
        let request = args.to_request()?;
        let config = AppConfig {
            seed: args.seed,
            test_fraction: args.test_fraction,
            ..config.clone()
        };

        tracing::info!("Training with upload '{}'", args.file.display());
        let outcome = TrainUseCase::new(&config, registry).execute(&request)?;
        print_json(&outcome)
    }

    fn run_predict(&self, registry: &FsModelRegistry, args: &PredictArgs) -> Result<()> {
        let results = PredictUseCase::new(registry).predict_file(&args.file, args.model.as_deref())?;
        print_json(&results)
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Status class and user-visible message for a failed command.
pub fn describe_failure(err: &anyhow::Error) -> (u16, String) {
    match err.downcast_ref::<PipelineError>() {
        Some(known) if known.is_user_facing() => (known.status_code(), known.to_string()),
        _ => {
            tracing::error!("{:#}", err);
            (500, "internal error".to_string())
        }
    }
}
