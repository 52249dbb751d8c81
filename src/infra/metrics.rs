// ============================================================
// Layer 6 — Static Metrics Report
// ============================================================
// Reads the cross-validation report produced offline by the
// training notebooks and reshapes its keys for the dashboard.
//
// Input (excerpt):
//   {
//     "resultados_cv_melhor_modelo": {
//       "Modelo": "LightGBM",
//       "Threshold Ótimo": 0.41,
//       "AUC ROC Média": 0.97, ...
//     },
//     "metricas_globais_teste": { ... },
//     "metricas_por_satelite_teste": { ... }
//   }
//
// Output: the same document with the summary keys rewritten
// to identifier-friendly names (AUC_ROC_Media, ...). The two
// test-metric sections pass through untouched.

use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::domain::error::{PipelineError, PipelineResult};

/// Cross-validation summary as written by the notebooks.
#[derive(Debug, Clone, Deserialize)]
struct RawCvSummary {
    #[serde(rename = "Modelo")]
    modelo: String,
    #[serde(rename = "Threshold Ótimo")]
    threshold_otimo: f64,
    #[serde(rename = "AUC ROC Média")]
    auc_roc_media: f64,
    #[serde(rename = "AUC PRC Média")]
    auc_prc_media: f64,
    #[serde(rename = "Acurácia Média")]
    acuracia_media: f64,
    #[serde(rename = "Precisão (Planeta) Média")]
    precisao_planeta_media: f64,
    #[serde(rename = "Recall (Planeta) Média")]
    recall_planeta_media: f64,
    #[serde(rename = "Precisão (Non Planet) Média")]
    precisao_non_planet_media: f64,
    #[serde(rename = "Recall (Non Planet) Média")]
    recall_non_planet_media: f64,
    #[serde(rename = "F1 (Planeta) Média")]
    f1_planeta_media: f64,
    #[serde(rename = "F1 (Non Planet) Média")]
    f1_non_planet_media: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct RawReport {
    resultados_cv_melhor_modelo: RawCvSummary,
    metricas_globais_teste:      serde_json::Value,
    metricas_por_satelite_teste: serde_json::Value,
}

/// Summary with the dashboard's key names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CvSummary {
    #[serde(rename = "Modelo")]
    pub modelo: String,
    #[serde(rename = "Threshold_Otimo")]
    pub threshold_otimo: f64,
    #[serde(rename = "AUC_ROC_Media")]
    pub auc_roc_media: f64,
    #[serde(rename = "AUC_PRC_Media")]
    pub auc_prc_media: f64,
    #[serde(rename = "Acuracia_Media")]
    pub acuracia_media: f64,
    #[serde(rename = "Precisao_Planeta_Media")]
    pub precisao_planeta_media: f64,
    #[serde(rename = "Recall_Planeta_Media")]
    pub recall_planeta_media: f64,
    #[serde(rename = "Precisao_Non_Planet_Media")]
    pub precisao_non_planet_media: f64,
    #[serde(rename = "Recall_Non_Planet_Media")]
    pub recall_non_planet_media: f64,
    #[serde(rename = "F1_Planeta_Media")]
    pub f1_planeta_media: f64,
    #[serde(rename = "F1_Non_Planet_Media")]
    pub f1_non_planet_media: f64,
}

impl From<RawCvSummary> for CvSummary {
    fn from(r: RawCvSummary) -> Self {
        Self {
            modelo:                    r.modelo,
            threshold_otimo:           r.threshold_otimo,
            auc_roc_media:             r.auc_roc_media,
            auc_prc_media:             r.auc_prc_media,
            acuracia_media:            r.acuracia_media,
            precisao_planeta_media:    r.precisao_planeta_media,
            recall_planeta_media:      r.recall_planeta_media,
            precisao_non_planet_media: r.precisao_non_planet_media,
            recall_non_planet_media:   r.recall_non_planet_media,
            f1_planeta_media:          r.f1_planeta_media,
            f1_non_planet_media:       r.f1_non_planet_media,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsReport {
    pub resultados_cv_melhor_modelo: CvSummary,
    pub metricas_globais_teste:      serde_json::Value,
    pub metricas_por_satelite_teste: serde_json::Value,
}

/// Load and reshape the report at `path`.
pub fn load_metrics_report(path: &Path) -> PipelineResult<MetricsReport> {
    if !path.is_file() {
        tracing::warn!("Metrics report not found at '{}'", path.display());
        return Err(PipelineError::MetricsReportMissing);
    }
    let raw = fs::read(path)
        .map_err(|e| PipelineError::Internal(format!("read '{}': {e}", path.display())))?;
    let report: RawReport = serde_json::from_slice(&raw)
        .map_err(|e| PipelineError::Internal(format!("error reading metrics: {e}")))?;

    Ok(MetricsReport {
        resultados_cv_melhor_modelo: report.resultados_cv_melhor_modelo.into(),
        metricas_globais_teste:      report.metricas_globais_teste,
        metricas_por_satelite_teste: report.metricas_por_satelite_teste,
    })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample() -> serde_json::Value {
        json!({
            "resultados_cv_melhor_modelo": {
                "Modelo": "LightGBM",
                "Threshold Ótimo": 0.41,
                "AUC ROC Média": 0.97,
                "AUC PRC Média": 0.95,
                "Acurácia Média": 0.92,
                "Precisão (Planeta) Média": 0.9,
                "Recall (Planeta) Média": 0.88,
                "Precisão (Non Planet) Média": 0.93,
                "Recall (Non Planet) Média": 0.94,
                "F1 (Planeta) Média": 0.89,
                "F1 (Non Planet) Média": 0.935
            },
            "metricas_globais_teste": { "accuracy": 0.91 },
            "metricas_por_satelite_teste": { "kepler": { "accuracy": 0.93 } }
        })
    }

    #[test]
    fn test_report_keys_are_reshaped() {
        let dir  = TempDir::new().unwrap();
        let path = dir.path().join("report.json");
        fs::write(&path, serde_json::to_vec(&sample()).unwrap()).unwrap();

        let report = load_metrics_report(&path).unwrap();
        let out = serde_json::to_value(&report).unwrap();
        assert_eq!(out["resultados_cv_melhor_modelo"]["AUC_ROC_Media"], 0.97);
        assert_eq!(out["resultados_cv_melhor_modelo"]["Threshold_Otimo"], 0.41);
        assert_eq!(out["metricas_por_satelite_teste"]["kepler"]["accuracy"], 0.93);
    }

    #[test]
    fn test_missing_report_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = load_metrics_report(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, PipelineError::MetricsReportMissing));
    }

    #[test]
    fn test_malformed_report_is_internal() {
        let dir  = TempDir::new().unwrap();
        let path = dir.path().join("report.json");
        fs::write(&path, br#"{"resultados_cv_melhor_modelo": {}}"#).unwrap();
        assert!(matches!(load_metrics_report(&path), Err(PipelineError::Internal(_))));
    }
}
