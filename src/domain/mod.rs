// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums and traits describing the core
// concepts of the classifier service:
//
//   error.rs   — the failure taxonomy shared by every layer
//   transit.rs — transit identifiers, star group keys and
//                per-row prediction results
//   bundle.rs  — a trained bundle (classifier + scaler +
//                metadata) and its identifier
//   traits.rs  — the registry abstraction the use cases
//                depend on
//
// Rules for this layer:
//   - NO file I/O
//   - NO model fitting code
//   - Only data types, their invariants, and traits

pub mod error;
pub mod transit;
pub mod bundle;
pub mod traits;
