// ============================================================
// Layer 5 — Booster Hyperparameters
// ============================================================
// Two types:
//
//   Hyperparameters — what a caller sends. Every field is
//                     optional; unknown keys are rejected.
//   BoosterParams   — what training actually uses, after
//                     defaults are filled in and ranges are
//                     checked. This is what metadata records.
//
// Defaults:
//   n_estimators       1600
//   learning_rate      0.0028
//   lambda_l1          1e-8
//   lambda_l2          0.2
//   num_leaves         350
//   max_depth          10      (<= 0 means unlimited)
//   feature_fraction   0.88
//   bagging_fraction   0.53
//   bagging_freq       3       (0 disables bagging)
//   min_child_samples  16

use serde::{Deserialize, Serialize};

use crate::domain::error::{PipelineError, PipelineResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Hyperparameters {
    pub n_estimators:      Option<usize>,
    pub learning_rate:     Option<f64>,
    pub lambda_l1:         Option<f64>,
    pub lambda_l2:         Option<f64>,
    pub num_leaves:        Option<usize>,
    pub max_depth:         Option<i32>,
    pub feature_fraction:  Option<f64>,
    pub bagging_fraction:  Option<f64>,
    pub bagging_freq:      Option<usize>,
    pub min_child_samples: Option<usize>,
}

impl Hyperparameters {
    /// Parse a JSON object of overrides. Blank input means "all defaults".
    pub fn from_json(raw: &str) -> PipelineResult<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(raw).map_err(|e| {
            PipelineError::InvalidHyperparameter(format!("invalid hyperparams JSON: {e}"))
        })
    }

    /// Fill in defaults and validate every value once.
    pub fn resolve(&self) -> PipelineResult<BoosterParams> {
        let d = BoosterParams::default();
        let params = BoosterParams {
            n_estimators:      self.n_estimators.unwrap_or(d.n_estimators),
            learning_rate:     self.learning_rate.unwrap_or(d.learning_rate),
            lambda_l1:         self.lambda_l1.unwrap_or(d.lambda_l1),
            lambda_l2:         self.lambda_l2.unwrap_or(d.lambda_l2),
            num_leaves:        self.num_leaves.unwrap_or(d.num_leaves),
            max_depth:         self.max_depth.unwrap_or(d.max_depth),
            feature_fraction:  self.feature_fraction.unwrap_or(d.feature_fraction),
            bagging_fraction:  self.bagging_fraction.unwrap_or(d.bagging_fraction),
            bagging_freq:      self.bagging_freq.unwrap_or(d.bagging_freq),
            min_child_samples: self.min_child_samples.unwrap_or(d.min_child_samples),
        };
        params.validate()?;
        Ok(params)
    }
}

/// Fully resolved booster settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoosterParams {
    pub n_estimators:      usize,
    pub learning_rate:     f64,
    pub lambda_l1:         f64,
    pub lambda_l2:         f64,
    pub num_leaves:        usize,
    pub max_depth:         i32,
    pub feature_fraction:  f64,
    pub bagging_fraction:  f64,
    pub bagging_freq:      usize,
    pub min_child_samples: usize,
}

impl Default for BoosterParams {
    fn default() -> Self {
        Self {
            n_estimators:      1600,
            learning_rate:     0.0028,
            lambda_l1:         1e-8,
            lambda_l2:         0.2,
            num_leaves:        350,
            max_depth:         10,
            feature_fraction:  0.88,
            bagging_fraction:  0.53,
            bagging_freq:      3,
            min_child_samples: 16,
        }
    }
}

impl BoosterParams {
    pub fn validate(&self) -> PipelineResult<()> {
        let fail = |msg: String| Err(PipelineError::InvalidHyperparameter(msg));

        if self.n_estimators == 0 {
            return fail("n_estimators must be at least 1".into());
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return fail(format!("learning_rate must be > 0, got {}", self.learning_rate));
        }
        for (name, v) in [("lambda_l1", self.lambda_l1), ("lambda_l2", self.lambda_l2)] {
            if !(v.is_finite() && v >= 0.0) {
                return fail(format!("{name} must be >= 0, got {v}"));
            }
        }
        if self.num_leaves < 2 {
            return fail(format!("num_leaves must be at least 2, got {}", self.num_leaves));
        }
        for (name, v) in [
            ("feature_fraction", self.feature_fraction),
            ("bagging_fraction", self.bagging_fraction),
        ] {
            if !(v > 0.0 && v <= 1.0) {
                return fail(format!("{name} must be in (0, 1], got {v}"));
            }
        }
        if self.min_child_samples == 0 {
            return fail("min_child_samples must be at least 1".into());
        }
        Ok(())
    }

    /// Depth limit, `None` when unlimited.
    pub fn depth_limit(&self) -> Option<usize> {
        (self.max_depth > 0).then_some(self.max_depth as usize)
    }

    pub fn bagging_enabled(&self) -> bool {
        self.bagging_freq > 0 && self.bagging_fraction < 1.0
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_overrides_resolve_to_defaults() {
        let params = Hyperparameters::from_json("").unwrap().resolve().unwrap();
        assert_eq!(params, BoosterParams::default());
        assert_eq!(params.n_estimators, 1600);
        assert_eq!(params.learning_rate, 0.0028);
        assert_eq!(params.min_child_samples, 16);
    }

    #[test]
    fn test_partial_overrides_keep_other_defaults() {
        let params = Hyperparameters::from_json(r#"{"n_estimators": 50, "num_leaves": 8}"#)
            .unwrap()
            .resolve()
            .unwrap();
        assert_eq!(params.n_estimators, 50);
        assert_eq!(params.num_leaves, 8);
        assert_eq!(params.lambda_l2, 0.2);
        assert_eq!(params.bagging_freq, 3);
    }

    #[test]
    fn test_unknown_option_is_rejected() {
        let err = Hyperparameters::from_json(r#"{"n_estimator": 10}"#).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidHyperparameter(_)));
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        for raw in [
            r#"{"learning_rate": 0}"#,
            r#"{"feature_fraction": 1.5}"#,
            r#"{"num_leaves": 1}"#,
            r#"{"n_estimators": 0}"#,
            r#"{"lambda_l2": -1}"#,
        ] {
            let hp = Hyperparameters::from_json(raw).unwrap();
            assert!(hp.resolve().is_err(), "{raw} should fail");
        }
    }

    #[test]
    fn test_depth_limit() {
        let mut p = BoosterParams::default();
        assert_eq!(p.depth_limit(), Some(10));
        p.max_depth = -1;
        assert_eq!(p.depth_limit(), None);
    }
}
