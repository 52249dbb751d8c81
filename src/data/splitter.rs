// ============================================================
// Layer 4 — Grouped Train/Test Splitter
// ============================================================
// Splits rows into a training set and a held-out test set
// while keeping every star system on exactly one side.
//
// Why split by star instead of by row?
//   A star with several transits would otherwise leak: the
//   model sees one transit while training and is scored on a
//   near-identical sibling at test time. Held-out metrics
//   would then overstate how well it handles new systems.
//
// Why a fixed seed?
//   The same upload must produce the same split, the same
//   model and the same metrics on every run.
//
// Algorithm:
//   1. Collect the distinct groups (first-seen order)
//   2. Shuffle them with a seeded StdRng
//   3. Move whole groups into test until the test row count
//      reaches test_fraction × N
//   4. Every remaining group goes to train
//
// The realised test fraction overshoots the target by at most
// one group's worth of rows.
//
// Reference: rand crate documentation (StdRng, SliceRandom)
//            scikit-learn GroupShuffleSplit

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use std::collections::HashMap;
use std::hash::Hash;

use crate::domain::error::{PipelineError, PipelineResult};

pub const DEFAULT_TEST_FRACTION: f64 = 0.15;
pub const DEFAULT_SEED: u64 = 42;

/// Row indices on each side of the split, ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSplit {
    pub train: Vec<usize>,
    pub test:  Vec<usize>,
}

impl GroupSplit {
    pub fn test_fraction(&self) -> f64 {
        let total = self.train.len() + self.test.len();
        self.test.len() as f64 / total.max(1) as f64
    }
}

/// Partition rows by `groups[i]`, the group key of row `i`.
///
/// # Arguments
/// * `groups`        - One group key per row, in row order
/// * `test_fraction` - Target share of rows held out, in (0, 1)
/// * `seed`          - Seed for the group shuffle
///
/// # Returns
/// Ascending train and test row indices. No group appears on
/// both sides.
///
/// # Example
/// ```ignore
/// let split = split_by_group(&["a", "a", "b", "c"], 0.25, 42)?;
/// // rows 0 and 1 always land on the same side
/// ```
pub fn split_by_group<K: Eq + Hash>(
    groups:        &[K],
    test_fraction: f64,
    seed:          u64,
) -> PipelineResult<GroupSplit> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(PipelineError::InvalidHyperparameter(format!(
            "test_fraction must be in (0, 1), got {test_fraction}"
        )));
    }

    // ── Step 1: bucket row indices by group ──────────────────────────────────
    let mut slot_of: HashMap<&K, usize> = HashMap::new();
    let mut members: Vec<Vec<usize>>    = Vec::new();
    for (row, key) in groups.iter().enumerate() {
        let slot = *slot_of.entry(key).or_insert_with(|| {
            members.push(Vec::new());
            members.len() - 1
        });
        members[slot].push(row);
    }

    if members.len() < 2 {
        return Err(PipelineError::InsufficientData(format!(
            "{} distinct star group(s); at least 2 are needed for a grouped split",
            members.len()
        )));
    }

    // ── Step 2: seeded shuffle of whole groups ───────────────────────────────
    let mut rng = StdRng::seed_from_u64(seed);
    members.shuffle(&mut rng);

    // ── Step 3: fill the test side up to the target ──────────────────────────
    let target   = test_fraction * groups.len() as f64;
    let mut test = Vec::new();
    let mut taken_groups = 0usize;
    for group in &members {
        if test.len() as f64 >= target {
            break;
        }
        test.extend_from_slice(group);
        taken_groups += 1;
    }

    if taken_groups == members.len() {
        return Err(PipelineError::InsufficientData(format!(
            "{} star groups cannot fill a {:.0}% test split and leave any for training",
            members.len(),
            test_fraction * 100.0
        )));
    }

    // ── Step 4: everything else trains ───────────────────────────────────────
    let mut train: Vec<usize> = members[taken_groups..].iter().flatten().copied().collect();
    train.sort_unstable();
    test.sort_unstable();

    tracing::debug!(
        "Grouped split: {} train rows, {} test rows ({} of {} groups held out)",
        train.len(),
        test.len(),
        taken_groups,
        members.len(),
    );

    Ok(GroupSplit { train, test })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// `groups` stars with `per_group` transits each.
    fn keys(groups: usize, per_group: usize) -> Vec<String> {
        (0..groups * per_group).map(|i| format!("star{}", i / per_group)).collect()
    }

    #[test]
    fn test_no_group_straddles_the_split() {
        let groups = keys(40, 5);
        let split  = split_by_group(&groups, 0.15, 42).unwrap();
        let train: HashSet<&String> = split.train.iter().map(|&i| &groups[i]).collect();
        let test:  HashSet<&String> = split.test.iter().map(|&i| &groups[i]).collect();
        assert!(train.is_disjoint(&test));
    }

    #[test]
    fn test_all_rows_preserved() {
        let groups = keys(23, 3);
        let split  = split_by_group(&groups, 0.2, 7).unwrap();
        let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..groups.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_fraction_close_to_target() {
        let groups = keys(200, 2);
        let split  = split_by_group(&groups, 0.15, 42).unwrap();
        assert!((split.test_fraction() - 0.15).abs() <= 2.0 / 400.0 + 1e-9);
    }

    #[test]
    fn test_uneven_groups_overshoot_by_at_most_one_group() {
        let groups: Vec<String> = (0..300).map(|i| format!("s{}", i % 37)).collect();
        let split = split_by_group(&groups, 0.15, 3).unwrap();
        let largest = 300 / 37 + 1;
        assert!(split.test.len() as f64 >= 0.15 * 300.0);
        assert!((split.test.len() as f64) < 0.15 * 300.0 + largest as f64);
    }

    #[test]
    fn test_deterministic_for_a_seed() {
        let groups = keys(30, 4);
        assert_eq!(
            split_by_group(&groups, 0.15, 42).unwrap(),
            split_by_group(&groups, 0.15, 42).unwrap()
        );
    }

    #[test]
    fn test_single_group_is_insufficient() {
        let groups = keys(1, 10);
        assert!(matches!(
            split_by_group(&groups, 0.15, 42),
            Err(PipelineError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_empty_input_is_insufficient() {
        let groups: Vec<String> = Vec::new();
        assert!(matches!(
            split_by_group(&groups, 0.15, 42),
            Err(PipelineError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_fraction_that_swallows_every_group() {
        // Two groups, 1 big and 1 tiny: whichever lands first,
        // a 0.99 target needs both of them.
        let groups: Vec<String> = (0..10).map(|i| if i == 0 { "a" } else { "b" }.to_string()).collect();
        assert!(matches!(
            split_by_group(&groups, 0.99, 42),
            Err(PipelineError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_rejects_out_of_range_fraction() {
        let groups = keys(10, 1);
        assert!(split_by_group(&groups, 0.0, 1).is_err());
        assert!(split_by_group(&groups, 1.0, 1).is_err());
    }
}
