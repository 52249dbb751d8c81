// ============================================================
// Layer 5 — ML / Model Layer
// ============================================================
// All model fitting and scoring lives here.
//
//   params.rs     — typed hyperparameters and their defaults
//   model.rs      — the boosted tree ensemble (persisted state)
//   trainer.rs    — histogram-based, leaf-wise gradient boosting
//   evaluator.rs  — held-out classification metrics
//   inferencer.rs — scaler + classifier applied to raw rows

/// Hyperparameter overrides and resolved booster settings
pub mod params;

/// Tree ensemble state and scoring
pub mod model;

/// Gradient boosting fit
pub mod trainer;

/// Accuracy, ROC/PR AUC, precision/recall/F1
pub mod evaluator;

/// Scaled scoring of raw feature rows
pub mod inferencer;
