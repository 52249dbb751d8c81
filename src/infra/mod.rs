// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns that touch the filesystem:
//
//   config.rs   — every path and seed the pipeline uses,
//                 built once by the CLI
//
//   registry.rs — versioned bundle storage. Writes classifier,
//                 scaler and metadata JSON into a temporary
//                 directory and renames it into place.
//
//   metrics.rs  — reads the offline cross-validation report
//                 and reshapes it for the dashboard

/// Paths and seeds passed explicitly to every component
pub mod config;

/// Filesystem implementation of the ModelRegistry trait
pub mod registry;

/// Static metrics report reader
pub mod metrics;
