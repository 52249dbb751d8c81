// ============================================================
// Layer 4 — Standard Scaler
// ============================================================
// Standardises every feature column:  z = (x - mean) / scale
//
// The statistics come from the training split only and are
// persisted beside the classifier, so inference applies the
// exact same transform.
//
// Zero-variance columns are centred only (scale = 1.0): the
// column becomes all zeros instead of a division by zero.
//
// Why population standard deviation?
//   It matches what the bundled default scaler was fitted
//   with, so a retrained bundle and the default transform
//   identical inputs identically.
//
// Reference: scikit-learn StandardScaler

use serde::{Deserialize, Serialize};

use crate::data::dataset::FeatureMatrix;
use crate::domain::error::{PipelineError, PipelineResult};

/// Fitted per-column statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerState {
    pub mean:  Vec<f64>,
    /// Population standard deviation, 1.0 for constant columns
    pub scale: Vec<f64>,
}

pub struct Scaler;

impl Scaler {
    /// Fit column statistics.
    ///
    /// # Arguments
    /// * `rows`    - Training feature rows, unscaled
    /// * `columns` - Feature names, for error messages; fixes the row width
    ///
    /// # Returns
    /// Per-column mean and scale, or `DegenerateFeature` when there
    /// are no rows or a column's statistics are not finite
    pub fn fit(rows: &[Vec<f64>], columns: &[String]) -> PipelineResult<ScalerState> {
        let width = columns.len();
        if rows.is_empty() {
            return Err(PipelineError::DegenerateFeature {
                column: columns.first().cloned().unwrap_or_default(),
                reason: "no training rows to fit the scaler on".to_string(),
            });
        }

        let n = rows.len() as f64;
        let mut mean = vec![0.0; width];
        for row in rows {
            check_width(row, width)?;
            for (m, x) in mean.iter_mut().zip(row) {
                *m += x;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut var = vec![0.0; width];
        for row in rows {
            for ((v, x), m) in var.iter_mut().zip(row).zip(&mean) {
                *v += (x - m) * (x - m);
            }
        }

        let mut scale = Vec::with_capacity(width);
        for (col, v) in var.iter().enumerate() {
            let std = (v / n).sqrt();
            if !std.is_finite() || !mean[col].is_finite() {
                return Err(PipelineError::DegenerateFeature {
                    column: columns[col].clone(),
                    reason: "non-finite mean or standard deviation".to_string(),
                });
            }
            if std == 0.0 {
                tracing::warn!("Feature '{}' is constant; centring without scaling", columns[col]);
                scale.push(1.0);
            } else {
                scale.push(std);
            }
        }

        Ok(ScalerState { mean, scale })
    }
}

impl ScalerState {
    pub fn width(&self) -> usize {
        self.mean.len()
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> PipelineResult<FeatureMatrix> {
        rows.iter()
            .map(|row| {
                check_width(row, self.width())?;
                Ok(row
                    .iter()
                    .zip(self.mean.iter().zip(&self.scale))
                    .map(|(x, (m, s))| (x - m) / s)
                    .collect())
            })
            .collect()
    }
}

fn check_width(row: &[f64], width: usize) -> PipelineResult<()> {
    if row.len() == width {
        Ok(())
    } else {
        Err(PipelineError::SchemaValidation {
            missing: vec![format!("expected {width} features, got {}", row.len())],
            present: Vec::new(),
        })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn cols(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("f{i}")).collect()
    }

    fn column_stats(rows: &[Vec<f64>], col: usize) -> (f64, f64) {
        let n = rows.len() as f64;
        let mean = rows.iter().map(|r| r[col]).sum::<f64>() / n;
        let var  = rows.iter().map(|r| (r[col] - mean).powi(2)).sum::<f64>() / n;
        (mean, var.sqrt())
    }

    #[test]
    fn test_fit_transform_standardises() {
        let rows: Vec<Vec<f64>> = (0..50)
            .map(|i| vec![i as f64 * 3.0 + 100.0, (i as f64).sin() * 0.01, (i * i) as f64])
            .collect();
        let state  = Scaler::fit(&rows, &cols(3)).unwrap();
        let scaled = state.transform(&rows).unwrap();
        for c in 0..3 {
            let (mean, std) = column_stats(&scaled, c);
            assert!(mean.abs() < 1e-9, "column {c} mean {mean}");
            assert!((std - 1.0).abs() < 1e-9, "column {c} std {std}");
        }
    }

    #[test]
    fn test_constant_column_is_centred_only() {
        let rows = vec![vec![5.0, 1.0], vec![5.0, 3.0]];
        let state = Scaler::fit(&rows, &cols(2)).unwrap();
        assert_eq!(state.scale[0], 1.0);
        let scaled = state.transform(&[vec![7.0, 2.0]]).unwrap();
        assert_eq!(scaled[0], vec![2.0, 0.0]);
    }

    #[test]
    fn test_fit_on_nothing_is_degenerate() {
        assert!(matches!(
            Scaler::fit(&[], &cols(2)),
            Err(PipelineError::DegenerateFeature { .. })
        ));
    }

    #[test]
    fn test_width_mismatch_is_rejected() {
        let state = Scaler::fit(&[vec![1.0, 2.0], vec![2.0, 3.0]], &cols(2)).unwrap();
        assert!(matches!(
            state.transform(&[vec![1.0]]),
            Err(PipelineError::SchemaValidation { .. })
        ));
    }
}
