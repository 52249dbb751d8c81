// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to accomplish
// one goal per command (train, predict, list, report).
//
// Rules for this layer:
//   - No ML math or model code here
//   - No printing here (that's Layer 1)
//   - No direct file formats here (that's Layer 4 and 6)
//   - Only workflow coordination
//
// Every use case borrows an AppConfig and a ModelRegistry,
// so tests can point the whole pipeline at a temp directory.

// The training workflow
pub mod train_use_case;

// Scoring uploads with a stored bundle
pub mod predict_use_case;

// Model listing and the static metrics report
pub mod catalog_use_case;
