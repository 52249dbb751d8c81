// ============================================================
// Layer 2 — CatalogUseCase
// ============================================================
// Read-only views: the list of stored bundles and the static
// cross-validation report.

use anyhow::Result;
use serde::Serialize;

use crate::domain::bundle::BundleEntry;
use crate::domain::error::PipelineError;
use crate::domain::traits::ModelRegistry;
use crate::infra::config::AppConfig;
use crate::infra::metrics::{load_metrics_report, MetricsReport};

#[derive(Debug, Clone, Serialize)]
pub struct ModelListing {
    pub models: Vec<BundleEntry>,
}

pub struct CatalogUseCase<'a> {
    config:   &'a AppConfig,
    registry: &'a dyn ModelRegistry,
}

impl<'a> CatalogUseCase<'a> {
    pub fn new(config: &'a AppConfig, registry: &'a dyn ModelRegistry) -> Self {
        Self { config, registry }
    }

    /// Every stored bundle, newest first. An empty registry is an error.
    pub fn list_models(&self) -> Result<ModelListing> {
        let models = self.registry.list()?;
        if models.is_empty() {
            return Err(PipelineError::NoModels.into());
        }
        let unreadable = models.iter().filter(|m| m.metadata.is_error()).count();
        if unreadable > 0 {
            tracing::warn!("{} of {} models have unreadable metadata", unreadable, models.len());
        }
        tracing::info!("Found {} trained models", models.len());
        Ok(ModelListing { models })
    }

    pub fn metrics_report(&self) -> Result<MetricsReport> {
        Ok(load_metrics_report(&self.config.metrics_report)?)
    }
}
