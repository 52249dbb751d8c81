// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The use cases talk to storage only through ModelRegistry.
//
// Implementations:
//   - FsModelRegistry → one directory per bundle on disk
//   - (future) an embedded database keyed by BundleId

use crate::domain::bundle::{BundleDraft, BundleEntry, BundleId, LoadedBundle, SavedBundle};
use crate::domain::error::PipelineResult;

// ─── ModelRegistry ────────────────────────────────────────────────────────────
/// Versioned storage for trained bundles.
pub trait ModelRegistry {
    /// Persist a new bundle. It only becomes visible to `list`
    /// and `load` once every artifact is on disk.
    fn save(&self, draft: &BundleDraft) -> PipelineResult<SavedBundle>;

    /// All visible bundles, newest identifier first.
    fn list(&self) -> PipelineResult<Vec<BundleEntry>>;

    /// Load one bundle. Fails with `BundleNotFound` when the id
    /// does not resolve to a complete bundle.
    fn load(&self, id: &BundleId) -> PipelineResult<LoadedBundle>;

    /// Load the pre-seeded fallback bundle. Fails with
    /// `DefaultModelMissing` when it is absent.
    fn load_default(&self) -> PipelineResult<LoadedBundle>;
}
