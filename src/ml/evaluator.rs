// ============================================================
// Layer 5 — Evaluator
// ============================================================
// Scores the held-out split. "Positive" is always the planet
// class; the non-planet trio mirrors it for the other class.
//
//   accuracy          correct / total
//   auc_roc           Mann-Whitney rank statistic, ties averaged
//   auc_prc           average precision: Σ (R_k - R_{k-1}) · P_k
//                     over distinct score thresholds, descending
//   precision/recall/F1 per class, 0 when a denominator is 0
//
// A held-out set with a single class has no ROC curve, so it
// is reported as an error rather than a made-up number.
//
// Reference: scikit-learn roc_auc_score, average_precision_score

use serde::{Deserialize, Serialize};

use crate::domain::error::{PipelineError, PipelineResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub accuracy:         f64,
    pub auc_roc:          f64,
    pub auc_prc:          f64,
    pub recall_planet:    f64,
    pub precision_planet: f64,
    pub f1_score_planet:  f64,
    #[serde(default)]
    pub precision_non_planet: f64,
    #[serde(default)]
    pub recall_non_planet:    f64,
    #[serde(default)]
    pub f1_score_non_planet:  f64,
    #[serde(default)]
    pub test_samples: usize,
}

/// Confusion counts with planet as the positive class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Confusion {
    tp: usize,
    fp: usize,
    tn: usize,
    fn_: usize,
}

impl Confusion {
    fn tally(y_true: &[bool], y_pred: &[bool]) -> Self {
        let mut c = Confusion::default();
        for (&t, &p) in y_true.iter().zip(y_pred) {
            match (t, p) {
                (true, true)   => c.tp += 1,
                (false, true)  => c.fp += 1,
                (false, false) => c.tn += 1,
                (true, false)  => c.fn_ += 1,
            }
        }
        c
    }
}

/// Held-out metrics for one training run.
///
/// # Arguments
/// * `y_true`  - True labels
/// * `y_pred`  - Thresholded predictions
/// * `y_score` - Planet probabilities, used by both AUCs
///
/// # Returns
/// `EvaluationMetrics`, or `MetricComputation` on empty,
/// mismatched or single-class input
pub fn evaluate(
    y_true:  &[bool],
    y_pred:  &[bool],
    y_score: &[f64],
) -> PipelineResult<EvaluationMetrics> {
    let n = y_true.len();
    if n == 0 {
        return Err(PipelineError::MetricComputation("held-out set is empty".into()));
    }
    if y_pred.len() != n || y_score.len() != n {
        return Err(PipelineError::MetricComputation(format!(
            "length mismatch: {} labels, {} predictions, {} scores",
            n,
            y_pred.len(),
            y_score.len()
        )));
    }
    let positives = y_true.iter().filter(|&&t| t).count();
    if positives == 0 || positives == n {
        return Err(PipelineError::MetricComputation(
            "held-out set contains a single class; ROC AUC is undefined".into(),
        ));
    }

    let c = Confusion::tally(y_true, y_pred);
    let precision_planet     = ratio(c.tp, c.tp + c.fp);
    let recall_planet        = ratio(c.tp, c.tp + c.fn_);
    let precision_non_planet = ratio(c.tn, c.tn + c.fn_);
    let recall_non_planet    = ratio(c.tn, c.tn + c.fp);

    Ok(EvaluationMetrics {
        accuracy: ratio(c.tp + c.tn, n),
        auc_roc:  roc_auc(y_true, y_score),
        auc_prc:  average_precision(y_true, y_score),
        recall_planet,
        precision_planet,
        f1_score_planet: f1(precision_planet, recall_planet),
        precision_non_planet,
        recall_non_planet,
        f1_score_non_planet: f1(precision_non_planet, recall_non_planet),
        test_samples: n,
    })
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

/// Area under the ROC curve via average ranks.
fn roc_auc(y_true: &[bool], y_score: &[f64]) -> f64 {
    let mut order: Vec<usize> = (0..y_score.len()).collect();
    order.sort_by(|&a, &b| y_score[a].total_cmp(&y_score[b]));

    let mut ranks = vec![0.0; y_score.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && y_score[order[j + 1]] == y_score[order[i]] {
            j += 1;
        }
        // 1-based average rank of the tie block [i, j]
        let avg = (i + j) as f64 / 2.0 + 1.0;
        for &k in &order[i..=j] {
            ranks[k] = avg;
        }
        i = j + 1;
    }

    let pos = y_true.iter().filter(|&&t| t).count() as f64;
    let neg = y_true.len() as f64 - pos;
    let rank_sum: f64 = ranks.iter().zip(y_true).filter(|(_, &t)| t).map(|(r, _)| r).sum();
    (rank_sum - pos * (pos + 1.0) / 2.0) / (pos * neg)
}

/// Step-wise area under the precision-recall curve.
fn average_precision(y_true: &[bool], y_score: &[f64]) -> f64 {
    let mut order: Vec<usize> = (0..y_score.len()).collect();
    order.sort_by(|&a, &b| y_score[b].total_cmp(&y_score[a]));

    let total_pos = y_true.iter().filter(|&&t| t).count() as f64;
    let (mut tp, mut fp) = (0.0, 0.0);
    let mut prev_recall = 0.0;
    let mut ap = 0.0;

    let mut i = 0;
    while i < order.len() {
        let threshold = y_score[order[i]];
        while i < order.len() && y_score[order[i]] == threshold {
            if y_true[order[i]] { tp += 1.0 } else { fp += 1.0 }
            i += 1;
        }
        let recall    = tp / total_pos;
        let precision = tp / (tp + fp);
        ap += (recall - prev_recall) * precision;
        prev_recall = recall;
    }
    ap
}
