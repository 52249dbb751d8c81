// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Applies a bundle's scaler and classifier to raw feature rows.
// Training uses it to score the held-out split, the predict
// use case to score uploads, so both paths share one transform.

use crate::data::scaler::ScalerState;
use crate::domain::bundle::LoadedBundle;
use crate::domain::error::{PipelineError, PipelineResult};
use crate::ml::model::BoostedEnsemble;

pub struct Inferencer<'a> {
    scaler:     &'a ScalerState,
    classifier: &'a BoostedEnsemble,
}

impl<'a> Inferencer<'a> {
    pub fn new(scaler: &'a ScalerState, classifier: &'a BoostedEnsemble) -> PipelineResult<Self> {
        if scaler.width() != classifier.n_features {
            return Err(PipelineError::Internal(format!(
                "scaler width {} does not match classifier width {}",
                scaler.width(),
                classifier.n_features
            )));
        }
        Ok(Self { scaler, classifier })
    }

    pub fn from_bundle(bundle: &'a LoadedBundle) -> PipelineResult<Self> {
        Self::new(&bundle.scaler, &bundle.classifier)
    }

    /// Scale, then score: (is_planet, P(planet)) per row, in order.
    pub fn score(&self, raw_rows: &[Vec<f64>]) -> PipelineResult<Vec<(bool, f64)>> {
        let scaled = self.scaler.transform(raw_rows)?;
        let scored = self.classifier.predict_batch(&scaled)?;
        tracing::debug!("Scored {} rows", scored.len());
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::{Node, Tree};

    #[test]
    fn test_scales_before_scoring() {
        // Raw 110 scales to +1 and lands in the right leaf
        let scaler = ScalerState { mean: vec![100.0], scale: vec![10.0] };
        let classifier = BoostedEnsemble {
            n_features: 1,
            init_score: 0.0,
            trees: vec![Tree {
                nodes: vec![
                    Node::Split { feature: 0, threshold: 0.0, left: 1, right: 2 },
                    Node::Leaf { value: -3.0 },
                    Node::Leaf { value: 3.0 },
                ],
            }],
        };
        let inf = Inferencer::new(&scaler, &classifier).unwrap();
        let out = inf.score(&[vec![110.0], vec![90.0]]).unwrap();
        assert!(out[0].0 && out[0].1 > 0.9);
        assert!(!out[1].0 && out[1].1 < 0.1);
    }

    #[test]
    fn test_width_mismatch_between_artifacts() {
        let scaler = ScalerState { mean: vec![0.0, 0.0], scale: vec![1.0, 1.0] };
        let classifier = BoostedEnsemble { n_features: 3, init_score: 0.0, trees: vec![] };
        assert!(Inferencer::new(&scaler, &classifier).is_err());
    }
}
