// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between an uploaded CSV and a scaled feature
// matrix. The pipeline flows in this order:
//
//   CSV file(s)
//       │
//       ▼
//   CsvTable          → reads rows, trims header names, merges
//       │
//       ▼
//   FeatureContract   → checks every required column is present
//       │
//       ▼
//   LabeledDataset    → numeric features, labels, star group keys
//       │
//       ▼
//   split_by_group    → train / test indices, one side per star
//       │
//       ▼
//   Scaler            → per-feature standardisation
//
// Each module is responsible for exactly one step.

/// Required feature columns and their validation
pub mod contract;

/// CSV reading and base + upload merging
pub mod loader;

/// Typed labeled / unlabeled datasets built from a table
pub mod dataset;

/// Grouped train/test splitting by star system
pub mod splitter;

/// Per-feature standardisation fitted on the training split
pub mod scaler;
