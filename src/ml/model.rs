// ============================================================
// Layer 5 — Boosted Tree Ensemble
// ============================================================
// The classifier state persisted in classifier.json.
//
//   raw(x)   = init_score + Σ tree_k(x)
//   P(planet | x) = sigmoid(raw(x))
//
// Each tree is a flat node array with the root at index 0.
// A split sends x[feature] <= threshold to the left child.
// Leaf values already include the learning-rate shrinkage.
//
// Why validate a loaded ensemble?
//   classifier.json may be hand-seeded (the default bundle),
//   and scoring indexes nodes and features directly. A child
//   index must point forward, inside the array, and a split
//   feature must exist, otherwise scoring would panic or walk
//   a cycle forever. `validate` rejects such trees up front.
//
// Reference: Rust Book §9 (Error Handling)

use serde::{Deserialize, Serialize};

use crate::domain::error::{PipelineError, PipelineResult};

/// Probability at or above which a row is labelled a planet.
pub const DECISION_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Split {
        feature:   usize,
        threshold: f64,
        left:      usize,
        right:     usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split { feature, threshold, left, right } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| matches!(n, Node::Leaf { .. })).count()
    }

    /// Check that `predict` terminates without indexing out of bounds.
    ///
    /// # Arguments
    /// * `n_features` - Width of the rows this tree will score
    ///
    /// # Returns
    /// A description of the first broken node, if any
    fn check(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".into());
        }
        let len = self.nodes.len();
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Leaf { value } if !value.is_finite() => {
                    return Err(format!("leaf {idx} has non-finite value {value}"));
                }
                Node::Leaf { .. } => {}
                Node::Split { feature, threshold, left, right } => {
                    if *feature >= n_features {
                        return Err(format!(
                            "node {idx} splits on feature {feature} of {n_features}"
                        ));
                    }
                    if threshold.is_nan() {
                        return Err(format!("node {idx} has a NaN threshold"));
                    }
                    // Children strictly after the parent: no cycles
                    for child in [*left, *right] {
                        if child <= idx || child >= len {
                            return Err(format!(
                                "node {idx} points to child {child} (tree has {len} nodes)"
                            ));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostedEnsemble {
    pub n_features: usize,
    pub init_score: f64,
    pub trees:      Vec<Tree>,
}

impl BoostedEnsemble {
    /// Reject ensembles that `predict_raw` could not score safely.
    ///
    /// # Returns
    /// `Internal` naming the first broken tree and node
    pub fn validate(&self) -> PipelineResult<()> {
        if self.n_features == 0 {
            return Err(PipelineError::Internal("classifier has zero features".into()));
        }
        if !self.init_score.is_finite() {
            return Err(PipelineError::Internal("classifier init_score is not finite".into()));
        }
        for (t, tree) in self.trees.iter().enumerate() {
            tree.check(self.n_features)
                .map_err(|e| PipelineError::Internal(format!("malformed classifier: tree {t}: {e}")))?;
        }
        Ok(())
    }

    /// Total leaves across all trees.
    pub fn leaf_count(&self) -> usize {
        self.trees.iter().map(Tree::leaf_count).sum()
    }

    /// Raw log-odds score for one (already scaled) row.
    pub fn predict_raw(&self, row: &[f64]) -> f64 {
        self.init_score + self.trees.iter().map(|t| t.predict(row)).sum::<f64>()
    }

    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        sigmoid(self.predict_raw(row))
    }

    /// (is_planet, P(planet)) per row.
    pub fn predict_batch(&self, rows: &[Vec<f64>]) -> PipelineResult<Vec<(bool, f64)>> {
        rows.iter()
            .map(|row| {
                if row.len() != self.n_features {
                    return Err(PipelineError::SchemaValidation {
                        missing: vec![format!(
                            "classifier expects {} features, got {}",
                            self.n_features,
                            row.len()
                        )],
                        present: Vec::new(),
                    });
                }
                let p = self.predict_proba(row);
                Ok((p >= DECISION_THRESHOLD, p))
            })
            .collect()
    }
}

pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn stump(threshold: f64, left: f64, right: f64) -> Tree {
        Tree {
            nodes: vec![
                Node::Split { feature: 0, threshold, left: 1, right: 2 },
                Node::Leaf { value: left },
                Node::Leaf { value: right },
            ],
        }
    }

    #[test]
    fn test_tree_routes_by_threshold() {
        let tree = stump(0.5, -1.0, 2.0);
        assert_eq!(tree.predict(&[0.5]), -1.0);
        assert_eq!(tree.predict(&[0.6]), 2.0);
        assert_eq!(tree.leaf_count(), 2);
    }

    #[test]
    fn test_ensemble_sums_trees() {
        let model = BoostedEnsemble {
            n_features: 1,
            init_score: 0.25,
            trees: vec![stump(0.0, -1.0, 1.0), stump(1.0, -0.5, 0.5)],
        };
        assert!((model.predict_raw(&[0.5]) - 0.75).abs() < 1e-12);
        let out = model.predict_batch(&[vec![-3.0], vec![3.0]]).unwrap();
        assert!(!out[0].0 && out[1].0);
    }

    #[test]
    fn test_wrong_width_is_rejected() {
        let model = BoostedEnsemble { n_features: 2, init_score: 0.0, trees: vec![] };
        assert!(model.predict_batch(&[vec![1.0]]).is_err());
    }

    #[test]
    fn test_sigmoid_is_stable() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(-1000.0) >= 0.0);
        assert!(sigmoid(1000.0) <= 1.0);
    }
    #[test]
    fn test_validate_accepts_well_formed_ensemble() {
        let model = BoostedEnsemble {
            n_features: 1,
            init_score: 0.0,
            trees: vec![stump(0.0, -1.0, 1.0), Tree { nodes: vec![Node::Leaf { value: 0.2 }] }],
        };
        assert!(model.validate().is_ok());
        assert_eq!(model.leaf_count(), 3);
    }

    #[test]
    fn test_validate_rejects_unsafe_trees() {
        let with_tree = |nodes: Vec<Node>| BoostedEnsemble {
            n_features: 2,
            init_score: 0.0,
            trees: vec![Tree { nodes }],
        };
        let leaf = || Node::Leaf { value: 0.0 };

        let cases = [
            with_tree(vec![]),
            with_tree(vec![Node::Split { feature: 2, threshold: 0.0, left: 1, right: 2 }, leaf(), leaf()]),
            with_tree(vec![Node::Split { feature: 0, threshold: 0.0, left: 1, right: 9 }, leaf(), leaf()]),
            with_tree(vec![Node::Split { feature: 0, threshold: 0.0, left: 0, right: 1 }, leaf()]),
            with_tree(vec![Node::Split { feature: 0, threshold: f64::NAN, left: 1, right: 2 }, leaf(), leaf()]),
            with_tree(vec![Node::Leaf { value: f64::INFINITY }]),
        ];
        for model in cases {
            assert!(matches!(model.validate(), Err(PipelineError::Internal(_))), "{model:?}");
        }
    }
}
